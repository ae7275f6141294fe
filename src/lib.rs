//! Upload backend for a small video hosting site.
//!
//! Authenticated callers attach a thumbnail image or a video file to a video
//! record they own. Thumbnails are written to a local assets directory; videos
//! are staged, probed for their aspect ratio and pushed to object storage.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
