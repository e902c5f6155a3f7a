use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::JobStatusView;
use crate::models::playlist::{GeneratePlaylistRequest, GeneratePlaylistResponse};
use crate::routes::error::{bearer_token, ApiError};
use crate::services::jobs::NewJob;
use crate::services::selection::{self, SourceSelection};

/// POST /api/v1/playlists/generate: collect the selection's tracks and
/// start an analysis job.
pub async fn generate_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GeneratePlaylistRequest>,
) -> Result<Json<GeneratePlaylistResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    request.validate()?;

    let source = SourceSelection {
        track_ids: request.selected_tracks,
        album_ids: request.selected_albums,
        artist_ids: request.selected_artists,
        playlist_ids: request.selected_playlists,
    };
    if source.is_empty() {
        return Err(ApiError::bad_request("No music selected"));
    }

    let catalog = state.catalog_for(&token);
    let collection = selection::collect_source_tracks(&catalog, &source)
        .await
        .map_err(|e| ApiError::upstream(format!("Failed to load selected music: {e}")))?;
    if collection.tracks.is_empty() {
        return Err(ApiError::bad_request("Selected music contains no playable tracks"));
    }

    let plan = selection::plan_counts(collection.tracks.len(), request.song_count);
    let user_tracks = selection::pick_user_tracks(&collection.tracks, plan.user_track_limit);
    let description = selection::enhance_description(&request.playlist_description, &collection.influences);

    tracing::info!(
        playlist = %request.playlist_name,
        unique_tracks = collection.tracks.len(),
        user_tracks = user_tracks.len(),
        recommendations = plan.recommendation_count,
        "Requesting AI recommendations"
    );

    let stream_id = state
        .jobs
        .create_job(NewJob {
            source_tracks: user_tracks.clone(),
            analysis_tracks: collection.tracks,
            playlist_name: request.playlist_name,
            playlist_description: description,
            recommendation_count: plan.recommendation_count,
            total_count: request.song_count,
        })
        .await;

    Ok(Json(GeneratePlaylistResponse {
        status: "processing".to_string(),
        stream_id,
        user_tracks,
        message: "AI is analyzing your music selection and generating recommendations...".to_string(),
    }))
}

/// GET /api/v1/analysis/{job_id}: poll an analysis job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> (StatusCode, Json<JobStatusView>) {
    let view = state.jobs.status(job_id).await;
    let status = if view.exists { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (status, Json(view))
}
