//! Defines the HTTP surface of the service.
//!
//! ## Structure
//! - **Uploads** (bearer token required, caller must own the video)
//!   - `POST /api/thumbnail_upload/{videoID}` — multipart field `thumbnail`
//!   - `POST /api/video_upload/{videoID}`     — multipart field `video`
//!
//! - **Reads**
//!   - `GET  /api/videos/{videoID}` — video record as JSON
//!   - `GET  /assets/{*path}`       — thumbnails and locally stored videos
//!
//! - **Probes**
//!   - `GET  /healthz`, `GET /readyz`

use crate::{
    config::AppConfig,
    errors::AppError,
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{upload_thumbnail, upload_video},
        video_handlers::get_video,
    },
    state::AppState,
};
use axum::{
    BoxError, Router,
    body::HttpBody,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

/// Build the router for all routes.
///
/// Body limits come from `cfg`. Both upload routes replace axum's default
/// limit with `RequestBodyLimitLayer`, which turns away an oversized
/// `Content-Length` before the handler (and any staging) runs. Its plain-text
/// rejection is rewritten into the usual JSON error body.
pub fn routes(cfg: &AppConfig) -> Router<AppState> {
    let thumbnail_limit = usize::try_from(cfg.max_thumbnail_bytes).unwrap_or(usize::MAX);
    let video_limit = usize::try_from(cfg.max_video_bytes).unwrap_or(usize::MAX);

    // In-progress writes and readiness scratch files are dot-files.
    let assets: Router = Router::new()
        .fallback_service(ServeDir::new(&cfg.assets_root))
        .layer(middleware::from_fn(hide_dot_files));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos/{videoID}", get(get_video))
        .route(
            "/api/thumbnail_upload/{videoID}",
            post(upload_thumbnail).layer((
                middleware::map_response(json_payload_too_large),
                RequestBodyLimitLayer::new(thumbnail_limit),
                DefaultBodyLimit::disable(),
            )),
        )
        .route(
            "/api/video_upload/{videoID}",
            post(upload_video).layer((
                middleware::map_response(json_payload_too_large),
                RequestBodyLimitLayer::new(video_limit),
                DefaultBodyLimit::disable(),
            )),
        )
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
}

/// The complete application with its state attached.
pub fn app(state: AppState) -> Router {
    routes(&state.config).with_state(state)
}

async fn json_payload_too_large<B>(response: Response<B>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response.into_response();
    }
    AppError::payload_too_large("Request body too large").into_response()
}

async fn hide_dot_files(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.') || segment.to_ascii_lowercase().starts_with("%2e")
    });
    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}
