use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub llm: ComponentHealth,
    pub jobs: JobTableHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub model: String,
}

#[derive(Serialize)]
pub struct JobTableHealth {
    pub status: String,
    pub active: usize,
}

/// GET /health: service status with LLM configuration and job table size.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let llm = state.jobs.llm();
    let llm_check = ComponentHealth {
        status: if llm.is_configured() { "ok" } else { "unconfigured" }.to_string(),
        model: llm.model().to_string(),
    };

    let jobs_check = JobTableHealth {
        status: "ok".to_string(),
        active: state.jobs.active_jobs().await,
    };

    // Without an LLM the service still answers, but every analysis fails.
    let healthy = llm_check.status == "ok";
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            llm: llm_check,
            jobs: jobs_check,
        },
    };

    (StatusCode::OK, Json(response))
}
