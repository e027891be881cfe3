//! Hearo: a music client core built on the iTunes Search API.
//!
//! Library state, the offline download cache, combined search and the
//! playback session live in [`model`]. [`app::AppServices`] wires them
//! together for a front end.

pub mod logging;

pub mod app;
pub mod audio;
pub mod config;
pub mod model;
