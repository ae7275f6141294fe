//! HTTP handlers.

pub mod health_handlers;
pub mod upload_handlers;
pub mod video_handlers;

use crate::{
    auth::AuthUser,
    errors::AppError,
    models::video::Video,
    services::video_store::StoreError,
    state::AppState,
};
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

/// The `{videoID}` path segment, parsed as a UUID.
#[derive(Debug, Clone, Copy)]
pub struct VideoId(pub Uuid);

impl<S> FromRequestParts<S> for VideoId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|err| AppError::bad_request("Invalid ID").with_cause(err))?;

        Uuid::parse_str(&raw)
            .map(VideoId)
            .map_err(|err| AppError::bad_request("Invalid ID").with_cause(err))
    }
}

/// Load `video_id` and make sure `user` owns it.
///
/// Runs before any of the request body is read.
pub(crate) async fn owned_video(
    state: &AppState,
    video_id: Uuid,
    user: &AuthUser,
) -> Result<Video, AppError> {
    let video = state
        .videos
        .get_video(video_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => AppError::not_found("Video not found").with_cause(err),
            other => AppError::internal("Unable to get video metadata").with_cause(other),
        })?;

    if video.user_id != user.user_id {
        return Err(
            AppError::unauthorized("Cannot upload to a video you do not own").with_cause(
                format!("user {} does not own video {}", user.user_id, video.id),
            ),
        );
    }

    Ok(video)
}
