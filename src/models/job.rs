use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::models::recommendation::Recommendation;
use crate::models::track::Track;

/// Status of an analysis job. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// Taste analysis produced by the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    #[serde(rename = "playlistName", default)]
    pub playlist_name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
    #[serde(default)]
    pub era: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub detailed_insights: String,
}

/// One LLM analysis request and its result.
///
/// Records are never mutated in place: the background task builds the
/// terminal record with [`AnalysisJob::completed`] or [`AnalysisJob::failed`]
/// and swaps it into the store in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub playlist_name: String,
    pub playlist_description: String,
    pub recommendation_count: usize,
    pub total_count: usize,
    /// Tracks that lead the final playlist.
    pub source_tracks: Vec<Track>,
    /// Every unique selected track; the LLM analyses all of them.
    pub analysis_tracks: Vec<Track>,
    pub content: Option<String>,
    pub analysis: Option<Analysis>,
    pub recommendations: Vec<Recommendation>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    pub fn new(
        source_tracks: Vec<Track>,
        playlist_name: String,
        playlist_description: String,
        recommendation_count: usize,
        total_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Processing,
            playlist_name,
            playlist_description,
            recommendation_count,
            total_count,
            analysis_tracks: source_tracks.clone(),
            source_tracks,
            content: None,
            analysis: None,
            recommendations: Vec::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Analyse a wider set than the tracks that lead the playlist.
    pub fn with_analysis_tracks(mut self, tracks: Vec<Track>) -> Self {
        if !tracks.is_empty() {
            self.analysis_tracks = tracks;
        }
        self
    }

    /// Terminal copy carrying the parsed LLM output.
    pub fn completed(&self, content: String, analysis: Analysis, recommendations: Vec<Recommendation>) -> Self {
        Self {
            status: JobStatus::Completed,
            content: Some(content),
            analysis: Some(analysis),
            recommendations,
            error: None,
            finished_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Terminal copy carrying a human-readable failure. Raw LLM text is kept
    /// when it was received but could not be parsed.
    pub fn failed(&self, error: String, content: Option<String>) -> Self {
        Self {
            status: JobStatus::Error,
            content,
            error: Some(error),
            finished_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    pub fn is_expired(&self, retention: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(retention) {
            Ok(retention) => now >= self.created_at + retention,
            Err(_) => false,
        }
    }
}

/// Response body of the job status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tracks: Option<Vec<Track>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusView {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            error: Some("Stream not found or expired".to_string()),
            ..Self::default()
        }
    }
}

impl From<&AnalysisJob> for JobStatusView {
    fn from(job: &AnalysisJob) -> Self {
        let completed = job.status == JobStatus::Completed;
        Self {
            exists: true,
            status: Some(job.status),
            completed: job.status.is_terminal(),
            content: job.content.clone(),
            analysis: job.analysis.clone(),
            recommendations: completed.then(|| job.recommendations.clone()),
            source_tracks: Some(job.source_tracks.clone()),
            error: job.error.clone(),
        }
    }
}
