//! VideoStore — point lookup and point update of video records in SQLite.
//!
//! Handlers read a record, change a URL field and write it back. There is no
//! optimistic locking: two concurrent updates to the same row race and the
//! last write wins.

use crate::models::video::{CreateVideoParams, Video};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const VIDEO_COLUMNS: &str =
    "id, created_at, updated_at, title, description, thumbnail_url, video_url, user_id";

#[derive(Clone)]
pub struct VideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl VideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Fetch a single video by id.
    ///
    /// Returns NotFound if no row matches.
    pub async fn get_video(&self, id: Uuid) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::NotFound(id),
                other => StoreError::Sqlx(other),
            })
    }

    /// Insert a new video owned by `params.user_id`.
    pub async fn create_video(&self, params: CreateVideoParams) -> StoreResult<Video> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos ({VIDEO_COLUMNS}) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.user_id)
        .fetch_one(&*self.db)
        .await?;

        Ok(video)
    }

    /// Persist the mutable fields of `video` and bump `updated_at`.
    ///
    /// The owner and creation time are never rewritten. Returns the stored
    /// record as it is after the update.
    pub async fn update_video(&self, video: &Video) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(&format!(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.thumbnail_url.as_deref())
        .bind(video.video_url.as_deref())
        .bind(Utc::now())
        .bind(video.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(video.id),
            other => StoreError::Sqlx(other),
        })
    }
}
