//! Asynchronous analysis jobs: creation, background LLM execution, status
//! reads, and expiry.
//!
//! A job record is written by exactly one background task. That task never
//! edits the stored record; it builds the terminal record and replaces the
//! stored one in a single `set`, so readers see either the processing record
//! or the complete terminal one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use garde::Validate;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::job::{Analysis, AnalysisJob, JobStatusView};
use crate::models::recommendation::Recommendation;
use crate::models::track::Track;
use crate::services::llm::{LanguageModel, LlmError};
use crate::services::prompt::build_analysis_prompt;
use crate::services::sanitizer::{sanitize_and_extract, SanitizeError};

/// How long a job stays readable after creation.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Upper bound on one LLM call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Storage for job records. The in-memory implementation is enough for a
/// single process; a shared cache can stand in for multi-process deployments.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Option<Arc<AnalysisJob>>;

    /// Insert or wholesale replace a record.
    async fn set(&self, job: AnalysisJob);

    /// Replace a record only while it is stored and still processing, as one
    /// atomic step. Returns whether the replacement happened.
    async fn finish(&self, job: AnalysisJob) -> bool;

    async fn delete(&self, id: Uuid) -> bool;

    /// Schedule removal of a record once `after` has elapsed.
    async fn expire(&self, id: Uuid, after: Duration);

    async fn len(&self) -> usize;
}

#[derive(Default, Clone)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Arc<AnalysisJob>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, id: Uuid) -> Option<Arc<AnalysisJob>> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn set(&self, job: AnalysisJob) {
        self.jobs.write().await.insert(job.id, Arc::new(job));
    }

    async fn finish(&self, job: AnalysisJob) -> bool {
        let mut jobs = self.jobs.write().await;
        let processing = jobs
            .get(&job.id)
            .is_some_and(|current| !current.status.is_terminal());
        if processing {
            jobs.insert(job.id, Arc::new(job));
        }
        processing
    }

    async fn delete(&self, id: Uuid) -> bool {
        self.jobs.write().await.remove(&id).is_some()
    }

    async fn expire(&self, id: Uuid, after: Duration) {
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut jobs = jobs.write().await;
            if jobs.remove(&id).is_some() {
                metrics::gauge!("analysis_jobs_active").set(jobs.len() as f64);
                info!(job_id = %id, "Removed expired analysis job");
            }
        });
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

/// Parameters of a new analysis job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Tracks that lead the final playlist.
    pub source_tracks: Vec<Track>,
    /// Every unique selected track, sent to the LLM. Empty means `source_tracks`.
    pub analysis_tracks: Vec<Track>,
    pub playlist_name: String,
    pub playlist_description: String,
    pub recommendation_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    pub retention: Duration,
    pub llm_timeout: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

/// Why a job ended in the error state.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error("AI service unavailable: {0}")]
    Llm(#[from] LlmError),

    #[error("Could not parse AI response: {0}")]
    Parse(#[from] SanitizeError),

    #[error("Could not parse AI response: {0}")]
    Payload(String),
}

/// Owns every analysis job and the background task that completes it.
pub struct AnalysisJobManager {
    store: Arc<dyn JobStore>,
    llm: Arc<dyn LanguageModel>,
    options: JobOptions,
}

impl AnalysisJobManager {
    pub fn new(store: Arc<dyn JobStore>, llm: Arc<dyn LanguageModel>, options: JobOptions) -> Self {
        Self { store, llm, options }
    }

    pub fn llm(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }

    /// Store a processing job, start its LLM call in the background, and
    /// return its id without waiting for the call.
    pub async fn create_job(&self, request: NewJob) -> Uuid {
        let job = AnalysisJob::new(
            request.source_tracks,
            request.playlist_name,
            request.playlist_description,
            request.recommendation_count,
            request.total_count,
        )
        .with_analysis_tracks(request.analysis_tracks);
        let id = job.id;

        self.store.set(job.clone()).await;
        self.store.expire(id, self.options.retention).await;

        metrics::counter!("analysis_jobs_created_total").increment(1);
        metrics::gauge!("analysis_jobs_active").set(self.store.len().await as f64);
        info!(
            job_id = %id,
            source_tracks = job.source_tracks.len(),
            analysis_tracks = job.analysis_tracks.len(),
            recommendation_count = job.recommendation_count,
            total_count = job.total_count,
            "Created analysis job"
        );

        let store = Arc::clone(&self.store);
        let llm = Arc::clone(&self.llm);
        let timeout = self.options.llm_timeout;
        tokio::spawn(async move {
            run_job(store, llm, job, timeout).await;
        });

        id
    }

    /// Status snapshot; `exists == false` when unknown or past retention.
    pub async fn status(&self, id: Uuid) -> JobStatusView {
        match self.job(id).await {
            Some(job) => JobStatusView::from(job.as_ref()),
            None => JobStatusView::not_found(),
        }
    }

    /// The current record, unless unknown or past retention.
    pub async fn job(&self, id: Uuid) -> Option<Arc<AnalysisJob>> {
        let job = self.store.get(id).await?;
        if job.is_expired(self.options.retention, Utc::now()) {
            debug!(job_id = %id, "Job past retention window");
            return None;
        }
        Some(job)
    }

    pub async fn active_jobs(&self) -> usize {
        self.store.len().await
    }
}

/// Background body of one job: prompt → LLM → sanitize → terminal record.
async fn run_job(store: Arc<dyn JobStore>, llm: Arc<dyn LanguageModel>, job: AnalysisJob, timeout: Duration) {
    let prompt = build_analysis_prompt(
        &job.analysis_tracks,
        &job.playlist_name,
        &job.playlist_description,
        job.recommendation_count,
        job.total_count,
    );

    info!(job_id = %job.id, model = llm.model(), "Starting LLM request");
    let start = Instant::now();
    let generated = match tokio::time::timeout(timeout, llm.generate(&prompt)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(timeout.as_secs())),
    };
    metrics::histogram!("analysis_llm_seconds").record(start.elapsed().as_secs_f64());

    let finished = match generated {
        Ok(text) => match parse_payload(&text, &job.playlist_name) {
            Ok((analysis, recommendations)) => {
                info!(
                    job_id = %job.id,
                    recommendations = recommendations.len(),
                    llm_ms = start.elapsed().as_millis() as u64,
                    "Analysis job completed"
                );
                job.completed(text, analysis, recommendations)
            }
            Err(failure) => {
                error!(job_id = %job.id, error = %failure, "Failed to parse AI response");
                if let JobFailure::Parse(e) = &failure {
                    debug!(job_id = %job.id, excerpt = %e.excerpt, "Unparseable AI response");
                }
                job.failed(failure.to_string(), Some(text))
            }
        },
        Err(e) => {
            let failure = JobFailure::from(e);
            error!(job_id = %job.id, error = %failure, "LLM request failed");
            job.failed(failure.to_string(), None)
        }
    };

    let counter = if finished.error.is_some() {
        "analysis_jobs_failed_total"
    } else {
        "analysis_jobs_completed_total"
    };
    metrics::counter!(counter).increment(1);

    if !store.finish(finished).await {
        debug!(job_id = %job.id, "Job expired or already finished, dropping result");
    }
}

/// Split the sanitized LLM object into analysis and recommendations.
///
/// `analysis` is required; invalid recommendations are dropped.
pub fn parse_payload(text: &str, playlist_name: &str) -> Result<(Analysis, Vec<Recommendation>), JobFailure> {
    let mut object: Map<String, Value> = sanitize_and_extract(text)?;

    let analysis_value = match object.remove("analysis") {
        Some(value @ Value::Object(_)) => value,
        Some(_) => return Err(JobFailure::Payload("\"analysis\" is not an object".to_string())),
        None => return Err(JobFailure::Payload("missing \"analysis\"".to_string())),
    };
    let mut analysis: Analysis =
        serde_json::from_value(analysis_value).map_err(|e| JobFailure::Payload(e.to_string()))?;
    if analysis.playlist_name.trim().is_empty() {
        analysis.playlist_name = playlist_name.to_string();
    }

    let entries = match object.remove("recommendations") {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(JobFailure::Payload("\"recommendations\" is not an array".to_string())),
    };

    let total = entries.len();
    let recommendations: Vec<Recommendation> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Recommendation>(entry).ok())
        .map(|mut rec| {
            rec.title = rec.title.trim().to_string();
            rec.artist = rec.artist.trim().to_string();
            rec
        })
        .filter(|rec| rec.validate().is_ok())
        .collect();

    if recommendations.len() < total {
        warn!(
            dropped = total - recommendations.len(),
            kept = recommendations.len(),
            "Dropped malformed recommendations"
        );
    }

    Ok((analysis, recommendations))
}
