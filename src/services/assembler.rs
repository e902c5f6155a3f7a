//! Final track list assembly and batched playlist writes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info};

use crate::models::job::AnalysisJob;
use crate::models::recommendation::ResolvedRecommendation;
use crate::models::track::Track;
use crate::services::catalog::{CatalogError, CreatedPlaylist, TrackCatalog, MAX_TRACKS_PER_ADD};
use crate::services::resolver::{RecommendationResolver, Resolution};

/// Source tracks first, then resolved recommendations, without duplicate
/// ids, cut to `total_count`. A shorter list is returned as-is when there
/// are not enough unique tracks.
pub fn build_track_list(
    source_tracks: &[Track],
    resolved: &[ResolvedRecommendation],
    total_count: usize,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();

    let source = source_tracks
        .iter()
        .map(|t| (t.id.as_str(), t.uri.as_str()));
    let recommended = resolved
        .iter()
        .map(|r| (r.catalog_id.as_str(), r.uri.as_str()));

    source
        .chain(recommended)
        .filter(|(id, _)| seen.insert(*id))
        .take(total_count)
        .map(|(_, uri)| uri.to_string())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReport {
    pub batches: usize,
    pub tracks_added: usize,
    pub snapshot_ids: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("Failed to create playlist: {0}")]
    CreatePlaylist(#[source] CatalogError),

    #[error("Adding batch {chunk_index} failed after {committed} tracks were added: {source}")]
    Batch {
        chunk_index: usize,
        committed: usize,
        #[source]
        source: CatalogError,
    },
}

impl AssemblyError {
    /// Tracks already in the playlist when the operation stopped.
    pub fn committed(&self) -> usize {
        match self {
            AssemblyError::CreatePlaylist(_) => 0,
            AssemblyError::Batch { committed, .. } => *committed,
        }
    }
}

/// Add `uris` in sequential batches of at most [`MAX_TRACKS_PER_ADD`].
///
/// Stops at the first failed batch; the error reports the failed batch index
/// and how many tracks were already committed. Nothing is retried.
pub async fn add_to_playlist(
    catalog: &dyn TrackCatalog,
    playlist_id: &str,
    uris: &[String],
) -> Result<AddReport, AssemblyError> {
    let mut report = AddReport::default();

    for (chunk_index, chunk) in uris.chunks(MAX_TRACKS_PER_ADD).enumerate() {
        match catalog.add_tracks(playlist_id, chunk).await {
            Ok(ack) => {
                report.batches += 1;
                report.tracks_added += chunk.len();
                report.snapshot_ids.extend(ack.snapshot_id);
                metrics::counter!("playlist_tracks_added_total").increment(chunk.len() as u64);
            }
            Err(source) => {
                error!(
                    playlist_id,
                    chunk_index,
                    committed = report.tracks_added,
                    error = %source,
                    "Failed to add batch to playlist"
                );
                return Err(AssemblyError::Batch {
                    chunk_index,
                    committed: report.tracks_added,
                    source,
                });
            }
        }
    }

    info!(playlist_id, batches = report.batches, tracks = report.tracks_added, "Added tracks to playlist");
    Ok(report)
}

/// Everything produced while turning a completed job into a playlist.
#[derive(Debug, Clone)]
pub struct AssembledPlaylist {
    pub playlist: CreatedPlaylist,
    pub uris: Vec<String>,
    /// Number of `uris` that came from the user's own selection.
    pub user_tracks: usize,
    pub resolution: Resolution,
    pub report: AddReport,
}

/// Resolve the job's recommendations, build the final list, create a
/// private playlist, and fill it.
pub async fn assemble_playlist(
    catalog: &dyn TrackCatalog,
    resolver: &RecommendationResolver,
    job: &AnalysisJob,
    name: &str,
    description: &str,
    total_count: usize,
) -> Result<AssembledPlaylist, AssemblyError> {
    let unique_sources = job
        .source_tracks
        .iter()
        .map(|t| t.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let min_required = total_count.saturating_sub(unique_sources);

    let resolution = resolver.resolve(&job.recommendations, min_required, catalog).await;
    let uris = build_track_list(&job.source_tracks, &resolution.resolved, total_count);
    let user_tracks = unique_sources.min(uris.len());

    if uris.len() < total_count {
        info!(
            job_id = %job.id,
            requested = total_count,
            available = uris.len(),
            "Not enough unique tracks, creating a shorter playlist"
        );
    }

    let playlist = catalog
        .create_playlist(name, description, false)
        .await
        .map_err(AssemblyError::CreatePlaylist)?;
    info!(job_id = %job.id, playlist_id = %playlist.id, tracks = uris.len(), "Created playlist");

    let report = add_to_playlist(catalog, &playlist.id, &uris).await?;

    Ok(AssembledPlaylist {
        playlist,
        uris,
        user_tracks,
        resolution,
        report,
    })
}
