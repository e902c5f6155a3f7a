//! Scripted stand-ins for the music catalog and the LLM.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use playlist_curator::models::job::JobStatusView;
use playlist_curator::models::track::{AlbumSummary, ArtistSummary, PlaylistSummary, Track};
use playlist_curator::services::catalog::{
    AddTracksAck, CatalogError, CreatedPlaylist, Page, Paged, SearchKind, SearchResults, TrackCatalog,
};
use playlist_curator::services::jobs::AnalysisJobManager;
use playlist_curator::services::llm::{LanguageModel, LlmError};

/// In-memory catalog answering searches from a query → tracks script.
///
/// Unscripted queries return no results. Every call that matters to the
/// assertions is recorded.
#[derive(Default)]
pub struct FakeCatalog {
    pub search_results: HashMap<String, Vec<Track>>,
    pub failing_queries: HashSet<String>,
    pub seed_recommendations: Vec<Track>,
    pub tracks: HashMap<String, Track>,
    pub albums: HashMap<String, (AlbumSummary, Vec<Track>)>,
    pub artists: HashMap<String, (ArtistSummary, Vec<Track>)>,
    pub playlists: HashMap<String, (PlaylistSummary, Vec<Track>)>,
    /// 1-based index of the add-tracks call that fails.
    pub fail_add_on_call: Option<usize>,
    pub fail_create: bool,

    pub searches: Mutex<Vec<String>>,
    pub seed_calls: Mutex<Vec<(Vec<String>, u32)>>,
    pub created: Mutex<Vec<(String, String, bool)>>,
    pub add_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: impl Into<String>, tracks: Vec<Track>) -> Self {
        self.search_results.insert(query.into(), tracks);
        self
    }

    pub fn with_failing_search(mut self, query: impl Into<String>) -> Self {
        self.failing_queries.insert(query.into());
        self
    }

    pub fn with_seed_recommendations(mut self, tracks: Vec<Track>) -> Self {
        self.seed_recommendations = tracks;
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.insert(track.id.clone(), track);
        self
    }

    pub fn with_album(mut self, id: &str, name: &str, artist: &str, tracks: Vec<Track>) -> Self {
        for track in &tracks {
            self.tracks.insert(track.id.clone(), track.clone());
        }
        let summary = AlbumSummary {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![artist.to_string()],
        };
        self.albums.insert(id.to_string(), (summary, tracks));
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str, top_tracks: Vec<Track>) -> Self {
        let summary = ArtistSummary {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.artists.insert(id.to_string(), (summary, top_tracks));
        self
    }

    pub fn with_playlist(mut self, id: &str, name: &str, tracks: Vec<Track>) -> Self {
        let summary = PlaylistSummary {
            id: id.to_string(),
            name: name.to_string(),
            total_tracks: tracks.len() as u32,
        };
        self.playlists.insert(id.to_string(), (summary, tracks));
        self
    }

    pub fn fail_add_on_call(mut self, call: usize) -> Self {
        self.fail_add_on_call = Some(call);
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn add_batch_sizes(&self) -> Vec<usize> {
        self.add_calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn added_uris(&self) -> Vec<String> {
        self.add_calls.lock().unwrap().iter().flatten().cloned().collect()
    }
}

fn page<T: Clone>(items: &[T], page: Page) -> Paged<T> {
    let start = (page.offset as usize).min(items.len());
    let end = (start + page.limit as usize).min(items.len());
    Paged {
        items: items[start..end].to_vec(),
        total: items.len() as u32,
        has_more: end < items.len(),
    }
}

#[async_trait]
impl TrackCatalog for FakeCatalog {
    async fn search(&self, query: &str, _kind: SearchKind, limit: u32) -> Result<SearchResults, CatalogError> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.failing_queries.contains(query) {
            return Err(CatalogError::Api {
                status: 500,
                message: "search backend unavailable".to_string(),
            });
        }
        let tracks = self
            .search_results
            .get(query)
            .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default();
        Ok(SearchResults { tracks })
    }

    async fn recommendations_by_seed_tracks(&self, seed_ids: &[String], limit: u32) -> Result<Vec<Track>, CatalogError> {
        self.seed_calls.lock().unwrap().push((seed_ids.to_vec(), limit));
        Ok(self.seed_recommendations.clone())
    }

    async fn create_playlist(&self, name: &str, description: &str, is_public: bool) -> Result<CreatedPlaylist, CatalogError> {
        if self.fail_create {
            return Err(CatalogError::RateLimited);
        }
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), description.to_string(), is_public));
        Ok(CreatedPlaylist {
            id: "pl-new".to_string(),
            url: "https://open.spotify.com/playlist/pl-new".to_string(),
        })
    }

    async fn add_tracks(&self, _playlist_id: &str, uris: &[String]) -> Result<AddTracksAck, CatalogError> {
        let call = {
            let calls = self.add_calls.lock().unwrap();
            calls.len() + 1
        };
        if self.fail_add_on_call == Some(call) {
            return Err(CatalogError::Api {
                status: 500,
                message: "add failed".to_string(),
            });
        }
        self.add_calls.lock().unwrap().push(uris.to_vec());
        Ok(AddTracksAck {
            snapshot_id: Some(format!("snap-{call}")),
        })
    }

    async fn get_track(&self, id: &str) -> Result<Track, CatalogError> {
        self.tracks
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn get_album(&self, id: &str) -> Result<AlbumSummary, CatalogError> {
        self.albums
            .get(id)
            .map(|(summary, _)| summary.clone())
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn get_artist(&self, id: &str) -> Result<ArtistSummary, CatalogError> {
        self.artists
            .get(id)
            .map(|(summary, _)| summary.clone())
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn get_playlist(&self, id: &str) -> Result<PlaylistSummary, CatalogError> {
        self.playlists
            .get(id)
            .map(|(summary, _)| summary.clone())
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn album_tracks(&self, id: &str, p: Page) -> Result<Paged<Track>, CatalogError> {
        self.albums
            .get(id)
            .map(|(_, tracks)| page(tracks, p))
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<Track>, CatalogError> {
        self.artists
            .get(id)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn playlist_tracks(&self, id: &str, p: Page) -> Result<Paged<Track>, CatalogError> {
        self.playlists
            .get(id)
            .map(|(_, tracks)| page(tracks, p))
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

/// What a [`ScriptedModel`] does when asked to generate.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    ApiError(u16, String),
    /// Never answers; only a timeout ends the call.
    Hang,
}

/// LLM double returning a fixed reply, optionally held until released.
pub struct ScriptedModel {
    reply: Reply,
    gate: Option<Arc<Notify>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Reply::Text(text.into()))
    }

    /// Hold the reply until `gate` is notified.
    pub fn gated(reply: Reply, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(reply)
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::ApiError(status, message) => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Poll until the job leaves `processing` or disappears.
pub async fn wait_for_terminal(manager: &AnalysisJobManager, id: Uuid) -> JobStatusView {
    let mut view = manager.status(id).await;
    for _ in 0..200 {
        if !view.exists || view.completed || view.error.is_some() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        view = manager.status(id).await;
    }
    panic!("job {id} did not finish in time");
}

pub fn track(id: &str, name: &str, artist: &str) -> Track {
    Track {
        id: id.to_string(),
        uri: format!("spotify:track:{id}"),
        name: name.to_string(),
        artists: vec![artist.to_string()],
        album: String::new(),
        album_image_url: None,
        popularity: None,
    }
}
