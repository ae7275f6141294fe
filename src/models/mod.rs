//! Core data models for the video hosting service.
//!
//! These map to database tables via `sqlx::FromRow` and serialize as JSON
//! via `serde` for API responses.

pub mod video;
