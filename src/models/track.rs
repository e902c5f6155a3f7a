use serde::{Deserialize, Serialize};

/// A catalog track, either picked by the user or matched from a recommendation.
///
/// Two tracks are the same track iff their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
}

impl Track {
    /// First credited artist, or an empty string for malformed catalog entries.
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }

    /// Artists joined the way they are shown to users and to the LLM.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Album header returned by catalog lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

/// Artist header returned by catalog lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
}

/// Playlist header returned by catalog lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub total_tracks: u32,
}
