//! Read access to video records.

use crate::{
    errors::AppError, handlers::VideoId, models::video::Video, services::video_store::StoreError,
    state::AppState,
};
use axum::{Json, extract::State};

/// GET `/api/videos/{videoID}` — the record with its current asset URLs.
pub async fn get_video(
    State(state): State<AppState>,
    video_id: VideoId,
) -> Result<Json<Video>, AppError> {
    let video = state
        .videos
        .get_video(video_id.0)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => AppError::not_found("Video not found").with_cause(err),
            other => AppError::internal("Unable to get video metadata").with_cause(other),
        })?;
    Ok(Json(video))
}
