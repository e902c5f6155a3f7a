//! Contract of the external music catalog.
//!
//! Resolution and playlist assembly only talk to the catalog through
//! [`TrackCatalog`], so tests can swap in a scripted fake and deployments
//! can point at Spotify via [`crate::services::spotify::SpotifyClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::models::track::{AlbumSummary, ArtistSummary, PlaylistSummary, Track};

/// Maximum number of seed tracks the recommendation endpoint accepts.
pub const MAX_SEED_TRACKS: usize = 5;

/// Maximum number of URIs accepted by one add-tracks call.
pub const MAX_TRACKS_PER_ADD: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SearchKind {
    Track,
    Album,
    Artist,
    Playlist,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
}

/// Offset/limit window for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: String,
}

/// Acknowledgement of one add-tracks call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddTracksAck {
    pub snapshot_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Catalog rate limit exceeded")]
    RateLimited,

    #[error("Not found in catalog: {0}")]
    NotFound(String),

    #[error("Unexpected catalog response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn search(&self, query: &str, kind: SearchKind, limit: u32) -> Result<SearchResults, CatalogError>;

    /// Catalog-native recommendations seeded by at most [`MAX_SEED_TRACKS`] track ids.
    async fn recommendations_by_seed_tracks(&self, seed_ids: &[String], limit: u32) -> Result<Vec<Track>, CatalogError>;

    async fn create_playlist(&self, name: &str, description: &str, is_public: bool) -> Result<CreatedPlaylist, CatalogError>;

    /// Add at most [`MAX_TRACKS_PER_ADD`] URIs to a playlist.
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<AddTracksAck, CatalogError>;

    async fn get_track(&self, id: &str) -> Result<Track, CatalogError>;

    async fn get_album(&self, id: &str) -> Result<AlbumSummary, CatalogError>;

    async fn get_artist(&self, id: &str) -> Result<ArtistSummary, CatalogError>;

    async fn get_playlist(&self, id: &str) -> Result<PlaylistSummary, CatalogError>;

    /// Album tracks; entries may lack album details until looked up with [`TrackCatalog::get_track`].
    async fn album_tracks(&self, id: &str, page: Page) -> Result<Paged<Track>, CatalogError>;

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<Track>, CatalogError>;

    async fn playlist_tracks(&self, id: &str, page: Page) -> Result<Paged<Track>, CatalogError>;
}
