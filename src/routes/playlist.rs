use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::job::JobStatus;
use crate::models::playlist::{CreatePlaylistRequest, CreatePlaylistResponse, PlaylistStats};
use crate::routes::error::{bearer_token, ApiError};
use crate::services::assembler::{self, AssemblyError};

const DEFAULT_PLAYLIST_NAME: &str = "AI Generated Playlist";
const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Created with AI based on your musical taste.";

/// POST /api/v1/playlists: build a catalog playlist from a completed analysis job.
pub async fn create_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreatePlaylistRequest>,
) -> Result<Json<CreatePlaylistResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    request.validate()?;

    let job = state
        .jobs
        .job(request.stream_id)
        .await
        .filter(|job| job.status == JobStatus::Completed)
        .ok_or_else(|| ApiError::bad_request("AI recommendations not completed or stream not found"))?;

    let name = request
        .playlist_name
        .or_else(|| job.analysis.as_ref().map(|a| a.playlist_name.clone()))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string());
    let description = request
        .playlist_description
        .or_else(|| Some(job.playlist_description.clone()))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PLAYLIST_DESCRIPTION.to_string());
    let total_count = request.song_count.unwrap_or(job.total_count);

    let catalog = state.catalog_for(&token);
    let assembled = assembler::assemble_playlist(&catalog, &state.resolver, &job, &name, &description, total_count)
        .await
        .map_err(|e| {
            let details = match &e {
                AssemblyError::Batch { chunk_index, committed, .. } => {
                    serde_json::json!({ "chunkIndex": chunk_index, "committed": committed })
                }
                AssemblyError::CreatePlaylist(_) => serde_json::json!({ "committed": 0 }),
            };
            ApiError::upstream(e.to_string()).with_details(details)
        })?;

    let stats = PlaylistStats {
        total_tracks: assembled.uris.len(),
        user_tracks: assembled.user_tracks,
        ai_tracks: assembled.uris.len() - assembled.user_tracks,
        fallback_tracks: assembled.resolution.stats.fallback_added,
        not_found: assembled.resolution.stats.not_found,
    };

    Ok(Json(CreatePlaylistResponse {
        success: true,
        playlist_id: assembled.playlist.id,
        playlist_url: assembled.playlist.url,
        stats,
        validated_recommendations: assembled.resolution.resolved,
        not_found_recommendations: assembled.resolution.unresolved,
    }))
}
