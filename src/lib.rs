//! Playlist curator
//!
//! Builds catalog playlists from a listener's selected music. An LLM analyses
//! the selection in a background job; its recommendations are parsed,
//! matched against the catalog, and written out as a new private playlist.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
