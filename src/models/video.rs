//! Represents a video record and the URLs derived from its uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for a single video.
///
/// The record is created elsewhere; upload handlers only fill in
/// `thumbnail_url` and `video_url`. The bytes themselves live in the assets
/// directory or the object store, never in the database.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Unique identifier, taken from the request path.
    pub id: Uuid,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// Absolute URL of the uploaded thumbnail, if any.
    pub thumbnail_url: Option<String>,

    /// Absolute URL of the uploaded video file, if any.
    pub video_url: Option<String>,

    /// Owner of the video. Only this user may change its URLs.
    pub user_id: Uuid,
}

/// Input for creating a new video record.
#[derive(Deserialize, Clone, Debug)]
pub struct CreateVideoParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub user_id: Uuid,
}
