use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use playlist_curator::app_state::AppState;
use playlist_curator::config::AppConfig;
use playlist_curator::routes;
use playlist_curator::services::{
    jobs::{AnalysisJobManager, InMemoryJobStore, JobOptions},
    llm::{GeminiClient, LanguageModel},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing playlist-curator server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_histogram!("analysis_llm_seconds", "Time spent waiting on the LLM per analysis job");
    metrics::describe_counter!("analysis_jobs_created_total", "Total analysis jobs started");
    metrics::describe_counter!("analysis_jobs_completed_total", "Total analysis jobs completed");
    metrics::describe_counter!("analysis_jobs_failed_total", "Total analysis jobs that ended in error");
    metrics::describe_gauge!("analysis_jobs_active", "Analysis jobs currently held in memory");
    metrics::describe_counter!("recommendations_resolved_total", "Recommendations matched to catalog tracks");
    metrics::describe_counter!("recommendations_unresolved_total", "Recommendations with no catalog match");
    metrics::describe_counter!("recommendations_fallback_total", "Tracks added from seed-based fallback");
    metrics::describe_counter!("playlist_tracks_added_total", "Tracks written to created playlists");

    // Upstream calls are bounded separately; this only guards against hung sockets.
    let http = reqwest::Client::builder()
        .timeout(config.llm_timeout() + Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    let llm = GeminiClient::new(
        http.clone(),
        &config.gemini_api_base,
        &config.gemini_model,
        config.gemini_api_key.clone(),
    );
    if !llm.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set; analysis jobs will fail");
    }

    let jobs = AnalysisJobManager::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(llm),
        JobOptions {
            retention: config.job_retention(),
            llm_timeout: config.llm_timeout(),
        },
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(jobs, http, config);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/playlists/generate", post(routes::analysis::generate_playlist))
        .route("/api/v1/analysis/{job_id}", get(routes::analysis::get_job_status))
        .route("/api/v1/playlists", post(routes::playlist::create_playlist))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    tracing::info!("Starting playlist-curator on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
