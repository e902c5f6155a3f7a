use serde::Deserialize;
use std::time::Duration;

use crate::services::{llm, resolver, spotify};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Gemini API key. Without it every analysis job ends in the error state.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,

    /// Upper bound on one LLM call, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// How long analysis jobs stay readable, in seconds
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Pause between catalog searches when validating recommendations
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,

    #[serde(default = "default_spotify_api_base")]
    pub spotify_api_base: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_gemini_model() -> String {
    llm::DEFAULT_MODEL.to_string()
}

fn default_gemini_api_base() -> String {
    llm::DEFAULT_API_BASE.to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_job_retention_secs() -> u64 {
    60 * 60
}

fn default_search_delay_ms() -> u64 {
    resolver::DEFAULT_SEARCH_DELAY.as_millis() as u64
}

fn default_spotify_api_base() -> String {
    spotify::DEFAULT_API_BASE.to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }
}
