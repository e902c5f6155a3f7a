//! Fuzzy matching of LLM-suggested (title, artist) pairs against catalog tracks.

use crate::models::recommendation::Recommendation;
use crate::models::track::Track;

/// Minimum overall score for a catalog track to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.6;

const TITLE_WEIGHT: f64 = 0.7;
const ARTIST_WEIGHT: f64 = 0.3;

/// Words that decorate track titles and artist credits without identifying them.
const NOISE_WORDS: &[&str] = &[
    "feat",
    "ft",
    "featuring",
    "with",
    "prod",
    "remix",
    "version",
    "edit",
    "instrumental",
    "radio",
    "extended",
    "original",
];

/// A scored pairing of a recommendation with one search result.
#[derive(Debug, Clone)]
pub struct MatchCandidate<'a> {
    pub track: &'a Track,
    pub title_similarity: f64,
    pub artist_similarity: f64,
    pub score: f64,
}

/// Lowercase, strip punctuation, drop noise words, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    stripped
        .split_whitespace()
        .filter(|word| !NOISE_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity of two free-text names in `[0, 1]`.
///
/// Identical names score 1, containment scores at least 0.75, otherwise the
/// score is the share of significant words (longer than two characters)
/// that match a word on the other side.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if a.contains(&b) || b.contains(&a) {
        let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
        return 0.75 + 0.25 * ratio;
    }

    let words_a = significant_words(&a);
    let words_b = significant_words(&b);
    let total = words_a.len().max(words_b.len());
    if total == 0 {
        return 0.0;
    }

    // Counting from both sides and keeping the lower count keeps the score symmetric.
    let matches = count_word_matches(&words_a, &words_b).min(count_word_matches(&words_b, &words_a));
    matches as f64 / total as f64
}

fn significant_words(s: &str) -> Vec<&str> {
    s.split_whitespace().filter(|w| w.chars().count() > 2).collect()
}

/// Each word on either side takes part in at most one match.
fn count_word_matches(from: &[&str], against: &[&str]) -> usize {
    let mut used = vec![false; against.len()];
    let mut count = 0;
    for word in from {
        let hit = against
            .iter()
            .enumerate()
            .find(|(i, other)| !used[*i] && (word == *other || word.contains(*other) || other.contains(word)));
        if let Some((i, _)) = hit {
            used[i] = true;
            count += 1;
        }
    }
    count
}

/// Score one catalog track against a recommendation.
pub fn score_candidate<'a>(recommendation: &Recommendation, track: &'a Track) -> MatchCandidate<'a> {
    let title_similarity = similarity(&recommendation.title, &track.name);
    let artist_similarity = track
        .artists
        .iter()
        .map(|artist| similarity(&recommendation.artist, artist))
        .fold(0.0_f64, f64::max);

    MatchCandidate {
        track,
        title_similarity,
        artist_similarity,
        score: title_similarity * TITLE_WEIGHT + artist_similarity * ARTIST_WEIGHT,
    }
}

/// Pick the highest-scoring search result, if it clears [`MATCH_THRESHOLD`].
///
/// Ties keep the catalog's own ordering.
pub fn best_match<'a>(recommendation: &Recommendation, candidates: &'a [Track]) -> Option<MatchCandidate<'a>> {
    let mut scored: Vec<MatchCandidate<'a>> = candidates
        .iter()
        .map(|track| score_candidate(recommendation, track))
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    scored.into_iter().next().filter(|best| best.score > MATCH_THRESHOLD)
}
