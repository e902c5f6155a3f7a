//! Canned LLM replies and catalog tracks.

#![allow(dead_code)]

use crate::helpers::track;
use playlist_curator::models::track::Track;

/// Reply shaped the way the model is asked to answer.
pub fn llm_reply(playlist_name: &str, recommendations: &[(&str, &str)]) -> String {
    let recs: Vec<serde_json::Value> = recommendations
        .iter()
        .map(|(title, artist)| {
            serde_json::json!({
                "title": title,
                "artist": artist,
                "reason": format!("{title} fits the late-night mood."),
            })
        })
        .collect();
    serde_json::json!({
        "analysis": {
            "playlistName": playlist_name,
            "genres": ["dream pop", "shoegaze"],
            "mood": ["hazy"],
            "era": ["1990s"],
            "themes": ["night"],
            "detailed_insights": "Layered guitars and soft vocals throughout."
        },
        "recommendations": recs,
    })
    .to_string()
}

/// The same reply wrapped in a markdown fence with chatter around it.
pub fn fenced_llm_reply(playlist_name: &str, recommendations: &[(&str, &str)]) -> String {
    format!(
        "Here is your analysis:\n```json\n{}\n```\nEnjoy!",
        llm_reply(playlist_name, recommendations)
    )
}

/// Reply with unescaped quotes inside a reason string.
pub const UNESCAPED_QUOTE_REPLY: &str = r#"{
  "analysis": {"playlistName": "Classics", "genres": ["rock"]},
  "recommendations": [
    {"title": "Imagine", "artist": "John Lennon", "reason": "The song "Imagine" is iconic."}
  ]
}"#;

pub const PROSE_REPLY: &str = "I'm sorry, I can't help with that request right now.";

pub const SHOEGAZE: &[(&str, &str)] = &[
    ("Only Shallow", "My Bloody Valentine"),
    ("Alison", "Slowdive"),
    ("Vapour Trail", "Ride"),
    ("Sweetness and Light", "Lush"),
    ("Blue Flower", "Mazzy Star"),
];

/// `count` distinct tracks with ids `{prefix}0..`.
pub fn numbered_tracks(prefix: &str, count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| track(&format!("{prefix}{i}"), &format!("Song {prefix}{i}"), "Various"))
        .collect()
}
