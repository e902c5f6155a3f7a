use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{jobs::AnalysisJobManager, resolver::RecommendationResolver, spotify::SpotifyClient};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<AnalysisJobManager>,
    pub resolver: RecommendationResolver,
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(jobs: AnalysisJobManager, http: reqwest::Client, config: AppConfig) -> Self {
        let resolver = RecommendationResolver::new().with_search_delay(config.search_delay());
        Self {
            jobs: Arc::new(jobs),
            resolver,
            http,
            config: Arc::new(config),
        }
    }

    /// Catalog client acting on behalf of the caller's access token.
    pub fn catalog_for(&self, access_token: &str) -> SpotifyClient {
        SpotifyClient::new(self.http.clone(), &self.config.spotify_api_base, access_token)
    }
}
