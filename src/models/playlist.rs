use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::recommendation::{Recommendation, ResolvedRecommendation};
use crate::models::track::Track;

fn default_song_count() -> usize {
    25
}

/// Request to analyze a selection and start generating recommendations.
///
/// Selected ids end up in catalog request paths, so each must be a
/// 22-character base62 catalog id.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlaylistRequest {
    #[garde(inner(pattern(r"^[0-9A-Za-z]{22}$")))]
    #[serde(default)]
    pub selected_tracks: Vec<String>,

    #[garde(inner(pattern(r"^[0-9A-Za-z]{22}$")))]
    #[serde(default)]
    pub selected_artists: Vec<String>,

    #[garde(inner(pattern(r"^[0-9A-Za-z]{22}$")))]
    #[serde(default)]
    pub selected_albums: Vec<String>,

    #[garde(inner(pattern(r"^[0-9A-Za-z]{22}$")))]
    #[serde(default)]
    pub selected_playlists: Vec<String>,

    #[garde(length(min = 1, max = 100))]
    pub playlist_name: String,

    #[garde(length(max = 300))]
    #[serde(default)]
    pub playlist_description: String,

    #[garde(range(min = 1, max = 100))]
    #[serde(default = "default_song_count")]
    pub song_count: usize,
}

/// Reply to a generate request; the client polls the job with `stream_id`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlaylistResponse {
    pub status: String,
    pub stream_id: Uuid,
    pub user_tracks: Vec<Track>,
    pub message: String,
}

/// Request to turn a completed job into a catalog playlist.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    #[garde(skip)]
    pub stream_id: Uuid,

    #[garde(length(min = 1, max = 100))]
    #[serde(default)]
    pub playlist_name: Option<String>,

    #[garde(length(max = 300))]
    #[serde(default)]
    pub playlist_description: Option<String>,

    #[garde(range(min = 1, max = 100))]
    #[serde(default)]
    pub song_count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStats {
    pub total_tracks: usize,
    pub user_tracks: usize,
    pub ai_tracks: usize,
    pub fallback_tracks: usize,
    pub not_found: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistResponse {
    pub success: bool,
    pub playlist_id: String,
    pub playlist_url: String,
    pub stats: PlaylistStats,
    pub validated_recommendations: Vec<ResolvedRecommendation>,
    pub not_found_recommendations: Vec<Recommendation>,
}
