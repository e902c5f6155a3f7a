use serde::Serialize;

use crate::models::track::Track;

/// Source track as presented to the LLM.
#[derive(Serialize)]
struct PromptTrack<'a> {
    id: &'a str,
    name: &'a str,
    artist: String,
    album: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    popularity: Option<u32>,
    uri: &'a str,
}

/// Build the analysis prompt: the user's tracks, the exact counts needed,
/// and a JSON-only answer schema.
pub fn build_analysis_prompt(
    tracks: &[Track],
    playlist_name: &str,
    playlist_description: &str,
    recommendation_count: usize,
    total_count: usize,
) -> String {
    let track_data: Vec<PromptTrack<'_>> = tracks
        .iter()
        .map(|t| PromptTrack {
            id: &t.id,
            name: &t.name,
            artist: t.artist_line(),
            album: &t.album,
            popularity: t.popularity,
            uri: &t.uri,
        })
        .collect();
    let track_json = serde_json::to_string_pretty(&track_data).unwrap_or_else(|_| "[]".to_string());

    let description = if playlist_description.trim().is_empty() {
        String::new()
    } else {
        format!("\nPlaylist description: {}\n", playlist_description.trim())
    };
    let name_json = serde_json::to_string(playlist_name).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"I want to create a Spotify playlist called {name_json} with {total_count} songs in total.
{description}
I have selected {selected} songs that I like. Analyze them to understand my taste, then recommend exactly {recommendation_count} more songs to complete the playlist.

My selected songs:
{track_json}

First analyze the musical patterns in my selection (genre, tempo, mood, era, artists). Then recommend exactly {recommendation_count} additional songs that are not already in my selection.

For each recommendation give the official song title as it appears on Spotify, the primary artist name (without featured artists), and a one or two sentence reason.

IMPORTANT: Return ONLY a JSON object. No prose, no markdown, no code fences. It must parse directly as JSON.

Use exactly this structure:
{{
  "analysis": {{
    "playlistName": {name_json},
    "genres": ["main genres"],
    "mood": ["moods"],
    "era": ["eras"],
    "themes": ["themes"],
    "detailed_insights": "a paragraph of detailed analysis"
  }},
  "recommendations": [
    {{ "title": "song title", "artist": "primary artist", "reason": "why it fits" }}
  ]
}}"#,
        selected = tracks.len(),
    )
}
