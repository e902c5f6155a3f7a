//! Resolution of LLM recommendations into real catalog tracks.
//!
//! Flow per recommendation: try each [`QueryVariant`] in order → score the
//! search results with the matcher → keep the first acceptable match.
//! When too few recommendations resolve, the catalog's own seed-based
//! recommendations fill the gap.

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use strum::{Display, IntoStaticStr};
use tracing::{debug, info, warn};

use crate::models::recommendation::{Recommendation, ResolvedRecommendation};
use crate::models::track::Track;
use crate::services::catalog::{SearchKind, TrackCatalog, MAX_SEED_TRACKS};
use crate::services::matcher::{self, MatchCandidate};
use crate::services::rate_limiter::RateLimiter;

/// Search results requested per query.
pub const SEARCH_LIMIT: u32 = 5;

/// Default pause between searches when validating in bulk.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(200);

/// Reason attached to tracks added by the seed-based fallback.
pub const FALLBACK_REASON: &str =
    "This track complements your selected music based on audio features and popularity.";

/// Search query shapes, from most to least precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum QueryVariant {
    /// `track:"T" artist:"A"`
    Precise,
    /// `T A`
    Relaxed,
    /// `track:"T"`
    TitleOnly,
    /// `T A` with punctuation removed
    Stripped,
}

impl QueryVariant {
    pub const ALL: [QueryVariant; 4] = [
        QueryVariant::Precise,
        QueryVariant::Relaxed,
        QueryVariant::TitleOnly,
        QueryVariant::Stripped,
    ];

    pub fn query(self, recommendation: &Recommendation) -> String {
        let (title, artist) = (recommendation.title.trim(), recommendation.artist.trim());
        match self {
            QueryVariant::Precise => format!(r#"track:"{title}" artist:"{artist}""#),
            QueryVariant::Relaxed => format!("{title} {artist}"),
            QueryVariant::TitleOnly => format!(r#"track:"{title}""#),
            QueryVariant::Stripped => format!("{} {}", strip_punctuation(title), strip_punctuation(artist)),
        }
    }

    /// Matches found by anything but the precise query are flagged approximate.
    pub fn is_approximate(self) -> bool {
        self != QueryVariant::Precise
    }
}

fn strip_punctuation(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));
    re.replace_all(s, "").into_owned()
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub requested: usize,
    pub found: usize,
    pub approximate: usize,
    pub fallback_added: usize,
    pub not_found: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub resolved: Vec<ResolvedRecommendation>,
    pub unresolved: Vec<Recommendation>,
    pub stats: ResolutionStats,
}

/// Resolves recommendations one search at a time, paced by a rate limiter.
#[derive(Debug, Clone, Default)]
pub struct RecommendationResolver {
    search_delay: Duration,
}

impl RecommendationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between consecutive searches, for bulk validation.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    /// Resolve every recommendation, then top up from seed-based catalog
    /// recommendations if fewer than `min_required` resolved.
    ///
    /// Per-item failures never abort the run; they end up in `unresolved`.
    pub async fn resolve(
        &self,
        recommendations: &[Recommendation],
        min_required: usize,
        catalog: &dyn TrackCatalog,
    ) -> Resolution {
        let mut limiter = RateLimiter::with_interval("catalog-search", self.search_delay);
        let mut resolution = Resolution::default();

        for recommendation in recommendations {
            match self.resolve_one(recommendation, catalog, &mut limiter).await {
                Some(resolved) => resolution.resolved.push(resolved),
                None => {
                    warn!(title = %recommendation.title, artist = %recommendation.artist, "Could not find track in catalog");
                    metrics::counter!("recommendations_unresolved_total").increment(1);
                    resolution.unresolved.push(recommendation.clone());
                }
            }
        }

        info!(
            found = resolution.resolved.len(),
            requested = recommendations.len(),
            "Resolved recommendations against catalog"
        );

        let found = resolution.resolved.len();
        if found < min_required && found > 0 {
            let added = fallback_recommendations(catalog, &resolution.resolved, min_required - found).await;
            metrics::counter!("recommendations_fallback_total").increment(added.len() as u64);
            resolution.resolved.extend(added);
        }

        resolution.stats = ResolutionStats {
            requested: recommendations.len(),
            found: resolution.resolved.len(),
            approximate: resolution.resolved.iter().filter(|r| r.approximate).count(),
            fallback_added: resolution.resolved.iter().filter(|r| r.from_fallback).count(),
            not_found: resolution.unresolved.len(),
        };
        resolution
    }

    async fn resolve_one(
        &self,
        recommendation: &Recommendation,
        catalog: &dyn TrackCatalog,
        limiter: &mut RateLimiter,
    ) -> Option<ResolvedRecommendation> {
        for variant in QueryVariant::ALL {
            let query = variant.query(recommendation);
            limiter.wait_if_needed().await;

            let results = match catalog.search(&query, SearchKind::Track, SEARCH_LIMIT).await {
                Ok(results) => {
                    limiter.report_success();
                    results
                }
                Err(e) => {
                    limiter.report_failure();
                    warn!(query = %query, error = %e, "Catalog search failed, trying next query");
                    continue;
                }
            };

            if let Some(candidate) = matcher::best_match(recommendation, &results.tracks) {
                debug!(
                    title = %recommendation.title,
                    variant = %variant,
                    score = candidate.score,
                    matched = %candidate.track.name,
                    "Matched recommendation"
                );
                let label: &'static str = variant.into();
                metrics::counter!("recommendations_resolved_total", "variant" => label).increment(1);
                return Some(annotate(recommendation, &candidate, variant));
            }
        }
        None
    }
}

fn annotate(recommendation: &Recommendation, candidate: &MatchCandidate<'_>, variant: QueryVariant) -> ResolvedRecommendation {
    let track = candidate.track;
    ResolvedRecommendation {
        recommendation: recommendation.clone(),
        catalog_id: track.id.clone(),
        uri: track.uri.clone(),
        matched_title: track.name.clone(),
        matched_artist: track.primary_artist().to_string(),
        album_image_url: track.album_image_url.clone(),
        validated: true,
        approximate: variant.is_approximate(),
        from_fallback: false,
    }
}

fn fallback_entry(track: Track) -> ResolvedRecommendation {
    ResolvedRecommendation {
        recommendation: Recommendation::new(track.name.clone(), track.primary_artist(), FALLBACK_REASON),
        matched_title: track.name.clone(),
        matched_artist: track.primary_artist().to_string(),
        catalog_id: track.id,
        uri: track.uri,
        album_image_url: track.album_image_url,
        validated: true,
        approximate: false,
        from_fallback: true,
    }
}

/// Seed the catalog's recommendation endpoint with the first resolved tracks
/// and keep the results not already present.
async fn fallback_recommendations(
    catalog: &dyn TrackCatalog,
    resolved: &[ResolvedRecommendation],
    needed: usize,
) -> Vec<ResolvedRecommendation> {
    let seeds: Vec<String> = resolved
        .iter()
        .take(MAX_SEED_TRACKS)
        .map(|r| r.catalog_id.clone())
        .collect();

    info!(
        found = resolved.len(),
        needed,
        seeds = seeds.len(),
        "Not enough resolved tracks, requesting seed-based recommendations"
    );

    let tracks = match catalog.recommendations_by_seed_tracks(&seeds, needed as u32).await {
        Ok(tracks) => tracks,
        Err(e) => {
            warn!(error = %e, "Seed-based recommendations failed");
            return Vec::new();
        }
    };

    let mut seen: HashSet<String> = resolved.iter().map(|r| r.catalog_id.clone()).collect();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .take(needed)
        .map(fallback_entry)
        .collect()
}
