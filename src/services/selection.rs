//! Expansion of a user's selection (tracks, albums, artists, playlists) into
//! the source tracks fed to the analysis, and the split between source tracks
//! and LLM recommendations in the final playlist.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::models::track::Track;
use crate::services::catalog::{CatalogError, Page, TrackCatalog};

/// Tracks taken from each selected album.
pub const TRACKS_PER_ALBUM: usize = 5;
/// Top tracks taken from each selected artist.
pub const TRACKS_PER_ARTIST: usize = 5;
/// Tracks taken from the start of each selected playlist.
pub const TRACKS_PER_PLAYLIST: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct SourceSelection {
    pub track_ids: Vec<String>,
    pub album_ids: Vec<String>,
    pub artist_ids: Vec<String>,
    pub playlist_ids: Vec<String>,
}

impl SourceSelection {
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
            && self.album_ids.is_empty()
            && self.artist_ids.is_empty()
            && self.playlist_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceCollection {
    /// Unique by id, in selection order.
    pub tracks: Vec<Track>,
    /// Human-readable labels of the albums, artists, and playlists used.
    pub influences: Vec<String>,
}

/// Look up every selected entity and gather its tracks.
///
/// Directly selected tracks must all resolve; a failing album, artist, or
/// playlist is logged and skipped.
pub async fn collect_source_tracks(
    catalog: &dyn TrackCatalog,
    selection: &SourceSelection,
) -> Result<SourceCollection, CatalogError> {
    let mut collected = Vec::new();
    let mut influences = Vec::new();

    for id in &selection.track_ids {
        collected.push(catalog.get_track(id).await?);
    }

    for id in &selection.album_ids {
        match album_tracks(catalog, id).await {
            Ok((label, tracks)) => {
                influences.push(label);
                collected.extend(tracks);
            }
            Err(e) => warn!(album_id = %id, error = %e, "Skipping album"),
        }
    }

    for id in &selection.artist_ids {
        match artist_tracks(catalog, id).await {
            Ok((label, tracks)) => {
                influences.push(label);
                collected.extend(tracks);
            }
            Err(e) => warn!(artist_id = %id, error = %e, "Skipping artist"),
        }
    }

    for id in &selection.playlist_ids {
        match playlist_tracks(catalog, id).await {
            Ok((label, tracks)) => {
                influences.push(label);
                collected.extend(tracks);
            }
            Err(e) => warn!(playlist_id = %id, error = %e, "Skipping playlist"),
        }
    }

    let total = collected.len();
    let tracks = dedupe_by_id(collected);
    info!(collected = total, unique = tracks.len(), "Collected source tracks");

    Ok(SourceCollection { tracks, influences })
}

async fn album_tracks(catalog: &dyn TrackCatalog, id: &str) -> Result<(String, Vec<Track>), CatalogError> {
    let album = catalog.get_album(id).await?;
    let label = match album.artists.first() {
        Some(artist) => format!("Album: {} by {}", album.name, artist),
        None => format!("Album: {}", album.name),
    };

    // Album listings omit album details, so each track is looked up in full.
    let listing = catalog.album_tracks(id, Page::first(TRACKS_PER_ALBUM as u32)).await?;
    let mut tracks = Vec::new();
    for item in listing.items.iter().take(TRACKS_PER_ALBUM) {
        tracks.push(catalog.get_track(&item.id).await?);
    }
    Ok((label, tracks))
}

async fn artist_tracks(catalog: &dyn TrackCatalog, id: &str) -> Result<(String, Vec<Track>), CatalogError> {
    let artist = catalog.get_artist(id).await?;
    let mut tracks = catalog.artist_top_tracks(id).await?;
    tracks.truncate(TRACKS_PER_ARTIST);
    Ok((format!("Artist: {}", artist.name), tracks))
}

async fn playlist_tracks(catalog: &dyn TrackCatalog, id: &str) -> Result<(String, Vec<Track>), CatalogError> {
    let playlist = catalog.get_playlist(id).await?;
    let mut listing = catalog.playlist_tracks(id, Page::first(TRACKS_PER_PLAYLIST as u32)).await?;
    listing.items.truncate(TRACKS_PER_PLAYLIST);
    Ok((format!("Playlist: {}", playlist.name), listing.items))
}

pub fn dedupe_by_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks.into_iter().filter(|t| seen.insert(t.id.clone())).collect()
}

/// How a playlist of `song_count` songs is split between the user's tracks
/// and LLM recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPlan {
    pub user_track_limit: usize,
    pub recommendation_count: usize,
}

/// User tracks fill at most half the playlist; recommendations fill the rest.
pub fn plan_counts(unique_tracks: usize, song_count: usize) -> CountPlan {
    let user_track_limit = unique_tracks.min(song_count / 2);
    CountPlan {
        user_track_limit,
        recommendation_count: song_count - user_track_limit,
    }
}

/// Random subset of `limit` tracks, or all of them when there are few enough.
pub fn pick_user_tracks(tracks: &[Track], limit: usize) -> Vec<Track> {
    if tracks.len() <= limit {
        return tracks.to_vec();
    }
    let mut shuffled = tracks.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled.truncate(limit);
    shuffled
}

/// Append the influence labels to the user's description.
pub fn enhance_description(description: &str, influences: &[String]) -> String {
    let description = description.trim();
    if influences.is_empty() {
        return description.to_string();
    }
    let influenced = format!("Influenced by: {}", influences.join(", "));
    if description.is_empty() {
        influenced
    } else {
        format!("{description}\n\n{influenced}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            uri: format!("spotify:track:{id}"),
            name: id.to_string(),
            artists: vec![],
            album: String::new(),
            album_image_url: None,
            popularity: None,
        }
    }

    #[test]
    fn test_plan_counts_caps_user_tracks_at_half() {
        assert_eq!(
            plan_counts(30, 25),
            CountPlan {
                user_track_limit: 12,
                recommendation_count: 13
            }
        );
        assert_eq!(
            plan_counts(10, 25),
            CountPlan {
                user_track_limit: 10,
                recommendation_count: 15
            }
        );
        assert_eq!(plan_counts(3, 1).recommendation_count, 1);
    }

    #[test]
    fn test_pick_user_tracks_subset() {
        let tracks: Vec<Track> = (0..20).map(|i| track(&i.to_string())).collect();
        let picked = pick_user_tracks(&tracks, 8);
        assert_eq!(picked.len(), 8);
        assert_eq!(dedupe_by_id(picked.clone()).len(), 8);
        assert!(picked.iter().all(|p| tracks.contains(p)));
    }

    #[test]
    fn test_pick_user_tracks_keeps_order_when_small() {
        let tracks = vec![track("a"), track("b")];
        assert_eq!(pick_user_tracks(&tracks, 5), tracks);
    }

    #[test]
    fn test_dedupe_preserves_first_occurrence() {
        let deduped = dedupe_by_id(vec![track("a"), track("b"), track("a")]);
        let ids: Vec<&str> = deduped.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_enhance_description() {
        let influences = vec!["Artist: Björk".to_string(), "Playlist: Rainy".to_string()];
        assert_eq!(enhance_description("", &[]), "");
        assert_eq!(enhance_description("", &influences), "Influenced by: Artist: Björk, Playlist: Rainy");
        assert_eq!(
            enhance_description("Moody.", &influences[..1]),
            "Moody.\n\nInfluenced by: Artist: Björk"
        );
    }
}
