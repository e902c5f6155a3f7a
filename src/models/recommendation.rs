use garde::Validate;
use serde::{Deserialize, Serialize};

/// A song suggested by the LLM, exactly as it said it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Recommendation {
    #[garde(length(min = 1, max = 300))]
    pub title: String,

    #[garde(length(min = 1, max = 300))]
    pub artist: String,

    #[garde(skip)]
    #[serde(default)]
    pub reason: String,
}

impl Recommendation {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            reason: reason.into(),
        }
    }
}

/// A recommendation annotated with the catalog track it was matched to.
///
/// The original recommendation text is kept untouched in `recommendation`;
/// the matched catalog data lives alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecommendation {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub catalog_id: String,
    pub uri: String,
    pub matched_title: String,
    pub matched_artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    pub validated: bool,
    /// Matched through a relaxed query rather than the precise one.
    pub approximate: bool,
    /// Added by the catalog's own seed-based recommendations, not the LLM.
    #[serde(default)]
    pub from_fallback: bool,
}
