//! Spotify Web API implementation of [`TrackCatalog`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::track::{AlbumSummary, ArtistSummary, PlaylistSummary, Track};
use crate::services::catalog::{
    AddTracksAck, CatalogError, CreatedPlaylist, Page, Paged, SearchKind, SearchResults, TrackCatalog,
};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Market used for artist top tracks.
const TOP_TRACKS_MARKET: &str = "US";

/// Spotify client bound to one user's access token.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Deserialize)]
struct SpotifyAlbumRef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    #[serde(default)]
    album: Option<SpotifyAlbumRef>,
    #[serde(default)]
    popularity: Option<u32>,
}

impl SpotifyTrack {
    /// Local files and unavailable entries come back without an id.
    fn into_track(self) -> Option<Track> {
        let id = self.id?;
        let (album, album_image_url) = match self.album {
            Some(album) => (album.name, album.images.into_iter().next().map(|i| i.url)),
            None => (String::new(), None),
        };
        Some(Track {
            id,
            uri: self.uri,
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album,
            album_image_url,
            popularity: self.popularity,
        })
    }
}

fn into_tracks(tracks: Vec<SpotifyTrack>) -> Vec<Track> {
    tracks.into_iter().filter_map(SpotifyTrack::into_track).collect()
}

#[derive(Deserialize)]
struct ItemsPage<T> {
    items: Vec<T>,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<ItemsPage<SpotifyTrack>>,
}

#[derive(Deserialize)]
struct TrackList {
    tracks: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyArtistFull {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct PlaylistTracksRef {
    #[serde(default)]
    total: u32,
}

#[derive(Deserialize)]
struct SpotifyPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    tracks: Option<PlaylistTracksRef>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct UserProfile {
    id: String,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    snapshot_id: Option<String>,
}

impl SpotifyClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, CatalogError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Decode(format!("{what}: {e}")))
    }

    async fn current_user_id(&self) -> Result<String, CatalogError> {
        let profile: UserProfile = self.send(self.get("/me"), "current user").await?;
        Ok(profile.id)
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn search(&self, query: &str, kind: SearchKind, limit: u32) -> Result<SearchResults, CatalogError> {
        let request = self.get("/search").query(&[
            ("q", query.to_string()),
            ("type", kind.to_string()),
            ("limit", limit.to_string()),
        ]);
        let response: SearchResponse = self.send(request, "search").await?;
        Ok(SearchResults {
            tracks: response.tracks.map(|page| into_tracks(page.items)).unwrap_or_default(),
        })
    }

    async fn recommendations_by_seed_tracks(&self, seed_ids: &[String], limit: u32) -> Result<Vec<Track>, CatalogError> {
        let request = self.get("/recommendations").query(&[
            ("seed_tracks", seed_ids.join(",")),
            ("limit", limit.to_string()),
        ]);
        let response: TrackList = self.send(request, "recommendations").await?;
        Ok(into_tracks(response.tracks))
    }

    async fn create_playlist(&self, name: &str, description: &str, is_public: bool) -> Result<CreatedPlaylist, CatalogError> {
        let user_id = self.current_user_id().await?;
        let request = self
            .post(&format!("/users/{user_id}/playlists"))
            .json(&serde_json::json!({
                "name": name,
                "description": description,
                "public": is_public,
            }));
        let playlist: SpotifyPlaylist = self.send(request, "create playlist").await?;
        let url = playlist
            .external_urls
            .and_then(|u| u.spotify)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));
        Ok(CreatedPlaylist { id: playlist.id, url })
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<AddTracksAck, CatalogError> {
        let request = self
            .post(&format!("/playlists/{playlist_id}/tracks"))
            .json(&serde_json::json!({ "uris": uris }));
        let response: SnapshotResponse = self.send(request, "add tracks").await?;
        Ok(AddTracksAck {
            snapshot_id: response.snapshot_id,
        })
    }

    async fn get_track(&self, id: &str) -> Result<Track, CatalogError> {
        let track: SpotifyTrack = self.send(self.get(&format!("/tracks/{id}")), "track").await?;
        track
            .into_track()
            .ok_or_else(|| CatalogError::Decode(format!("track {id} has no id")))
    }

    async fn get_album(&self, id: &str) -> Result<AlbumSummary, CatalogError> {
        let album: SpotifyAlbum = self.send(self.get(&format!("/albums/{id}")), "album").await?;
        Ok(AlbumSummary {
            id: album.id,
            name: album.name,
            artists: album.artists.into_iter().map(|a| a.name).collect(),
        })
    }

    async fn get_artist(&self, id: &str) -> Result<ArtistSummary, CatalogError> {
        let artist: SpotifyArtistFull = self.send(self.get(&format!("/artists/{id}")), "artist").await?;
        Ok(ArtistSummary {
            id: artist.id,
            name: artist.name,
        })
    }

    async fn get_playlist(&self, id: &str) -> Result<PlaylistSummary, CatalogError> {
        let playlist: SpotifyPlaylist = self.send(self.get(&format!("/playlists/{id}")), "playlist").await?;
        Ok(PlaylistSummary {
            id: playlist.id,
            name: playlist.name,
            total_tracks: playlist.tracks.map(|t| t.total).unwrap_or(0),
        })
    }

    async fn album_tracks(&self, id: &str, page: Page) -> Result<Paged<Track>, CatalogError> {
        let request = self
            .get(&format!("/albums/{id}/tracks"))
            .query(&[("limit", page.limit), ("offset", page.offset)]);
        let response: ItemsPage<SpotifyTrack> = self.send(request, "album tracks").await?;
        Ok(Paged {
            items: into_tracks(response.items),
            total: response.total,
            has_more: response.next.is_some(),
        })
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<Track>, CatalogError> {
        let request = self
            .get(&format!("/artists/{id}/top-tracks"))
            .query(&[("market", TOP_TRACKS_MARKET)]);
        let response: TrackList = self.send(request, "artist top tracks").await?;
        Ok(into_tracks(response.tracks))
    }

    async fn playlist_tracks(&self, id: &str, page: Page) -> Result<Paged<Track>, CatalogError> {
        let request = self
            .get(&format!("/playlists/{id}/tracks"))
            .query(&[("limit", page.limit), ("offset", page.offset)]);
        let response: ItemsPage<PlaylistItem> = self.send(request, "playlist tracks").await?;
        Ok(Paged {
            items: response
                .items
                .into_iter()
                .filter_map(|item| item.track.and_then(SpotifyTrack::into_track))
                .collect(),
            total: response.total,
            has_more: response.next.is_some(),
        })
    }
}
