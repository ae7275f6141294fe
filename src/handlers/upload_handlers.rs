//! Thumbnail and video upload handlers.
//!
//! Both flows run the same gate first (path id, bearer token, ownership),
//! then read the multipart body, validate the declared MIME type, write the
//! bytes to their destination and record the resulting URL on the video.
//! Nothing is rolled back: a stored file whose record update fails stays
//! where it is.

use crate::{
    auth::AuthUser,
    errors::AppError,
    handlers::{VideoId, owned_video},
    models::video::Video,
    services::{assets::random_name, staging::StagedFile, uploader::UploadError},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::{io, pin::pin};
use tokio_util::io::StreamReader;

pub const THUMBNAIL_FIELD: &str = "thumbnail";
pub const VIDEO_FIELD: &str = "video";
pub const VIDEO_MIME: &str = "video/mp4";

/// File extension for an accepted thumbnail type; `None` means rejected.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// POST `/api/thumbnail_upload/{videoID}` — store an image under a random
/// name in the assets directory and point the video's thumbnail at it.
#[tracing::instrument(skip_all, fields(video_id = %video_id.0, user_id = %user.user_id))]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    video_id: VideoId,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Video>, AppError> {
    let mut video = owned_video(&state, video_id.0, &user).await?;
    let mut multipart = multipart
        .map_err(|err| AppError::bad_request("Unable to parse form file").with_cause(err))?;

    while let Some(field) = multipart.next_field().await.map_err(|err| form_error(&err))? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let content_type = declared_mime(&field)?;
        let extension = image_extension(&content_type).ok_or_else(|| {
            AppError::bad_request("MIME type must be image/jpeg or image/png")
                .with_cause(format!("declared type `{}`", content_type))
        })?;
        tracing::info!(content_type = %content_type, "uploading thumbnail");

        let name = random_name()
            .map_err(|err| AppError::internal("Unable to generate filename").with_cause(err))?;
        let key = format!("{}.{}", name, extension);

        let mut reader = pin!(field_reader(field));
        let size = state
            .assets
            .write(&key, &mut reader)
            .await
            .map_err(save_error)?;

        video.thumbnail_url = Some(state.assets.url_for(&key));
        let updated = state.videos.update_video(&video).await.map_err(|err| {
            AppError::internal("Unable to update video metadata").with_cause(err)
        })?;

        tracing::info!(key = %key, bytes = size, "thumbnail stored");
        return Ok(Json(updated));
    }

    Err(missing_field(THUMBNAIL_FIELD))
}

/// POST `/api/video_upload/{videoID}` — stage the file locally, classify
/// its aspect ratio, push it to the object store under
/// `<landscape|portrait|other>/<random>.mp4` and record the URL.
///
/// Responds 202 with an empty body.
#[tracing::instrument(skip_all, fields(video_id = %video_id.0, user_id = %user.user_id))]
pub async fn upload_video(
    State(state): State<AppState>,
    video_id: VideoId,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, AppError> {
    let mut video = owned_video(&state, video_id.0, &user).await?;
    let mut multipart = multipart
        .map_err(|err| AppError::bad_request("Unable to parse form file").with_cause(err))?;

    let (content_type, mut staged) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| form_error(&err))?
            .ok_or_else(|| missing_field(VIDEO_FIELD))?;
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = declared_mime(&field)?;
        if content_type != VIDEO_MIME {
            return Err(AppError::bad_request("MIME type must be video/mp4")
                .with_cause(format!("declared type `{}`", content_type)));
        }
        tracing::info!("uploading video");

        let mut staged = StagedFile::create_in(&state.config.temp_dir, ".mp4")
            .map_err(|err| AppError::internal("Unable to create local file").with_cause(err))?;
        let mut reader = pin!(field_reader(field));
        staged
            .fill_from(&mut reader)
            .await
            .map_err(|err| copy_error(err, "Unable to copy to local storage"))?;

        break (content_type, staged);
    };

    staged
        .rewind()
        .await
        .map_err(|err| AppError::internal("Unable to seek in local file").with_cause(err))?;

    let aspect = state
        .probe
        .aspect_ratio(staged.path())
        .await
        .map_err(|err| {
            AppError::internal("Unable to determine video aspect ratio").with_cause(err)
        })?;

    let name = random_name()
        .map_err(|err| AppError::internal("Unable to generate filename").with_cause(err))?;
    let key = format!("{}/{}.mp4", aspect.key_prefix(), name);

    let body = staged
        .reader()
        .await
        .map_err(|err| AppError::internal("Unable to seek in local file").with_cause(err))?;
    let url = state
        .uploader
        .put(body, &key, &content_type)
        .await
        .map_err(|err| AppError::internal("Failed to upload video").with_cause(err))?;

    video.video_url = Some(url);
    state
        .videos
        .update_video(&video)
        .await
        .map_err(|err| AppError::internal("Unable to update video metadata").with_cause(err))?;

    tracing::info!(key = %key, aspect = %aspect, bytes = staged.len(), "video stored");
    Ok(StatusCode::ACCEPTED)
}

/// The field's declared media type without parameters, e.g. `image/png`.
fn declared_mime(field: &Field<'_>) -> Result<String, AppError> {
    let raw = field
        .content_type()
        .ok_or_else(|| AppError::bad_request("Unable to parse header").with_cause("no content type"))?;
    let parsed: mime::Mime = raw
        .parse()
        .map_err(|err: mime::FromStrError| AppError::bad_request("Unable to parse header").with_cause(err))?;
    Ok(parsed.essence_str().to_string())
}

fn field_reader(field: Field<'_>) -> StreamReader<impl Stream<Item = io::Result<Bytes>> + '_, Bytes> {
    StreamReader::new(field.map_err(io::Error::other))
}

fn missing_field(name: &str) -> AppError {
    AppError::bad_request("Unable to parse form file")
        .with_cause(format!("form has no `{}` field", name))
}

fn form_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large("Request body too large").with_cause(err)
    } else {
        AppError::bad_request("Unable to parse form file").with_cause(err)
    }
}

/// A copy out of a multipart field can fail on either side; a broken or
/// oversized form is the caller's fault, a failed write is ours.
fn copy_error(err: io::Error, msg: &str) -> AppError {
    if let Some(form_err) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
    {
        return form_error(form_err);
    }
    AppError::internal(msg).with_cause(err)
}

fn save_error(err: UploadError) -> AppError {
    match err {
        UploadError::Io(io_err) => copy_error(io_err, "Unable to save file"),
        other => AppError::internal("Unable to save file").with_cause(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types_map_to_extensions() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/png"), Some("png"));
    }

    #[test]
    fn other_image_types_are_rejected() {
        for content_type in ["image/gif", "image/webp", "video/mp4", "text/plain", ""] {
            assert_eq!(image_extension(content_type), None, "{content_type}");
        }
    }

    #[test]
    fn write_failures_are_internal() {
        let err = copy_error(io::Error::other("disk full"), "Unable to save file");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Unable to save file");
    }

    #[test]
    fn invalid_key_is_internal() {
        let err = save_error(UploadError::InvalidKey("../x".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
