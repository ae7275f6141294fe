#![allow(dead_code)]
//! Shared helpers for router-level integration tests.
//!
//! Every test app gets its own in-memory SQLite database, its own assets and
//! staging directories, and the local storage backend, so nothing touches the
//! network or shared state.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use video_host::{
    auth::jwt::make_token,
    config::{AppConfig, Args},
    db,
    models::video::{CreateVideoParams, Video},
    routes::routes::app,
    services::uploader::ObjectUploader,
    state::AppState,
};

pub const TEST_SECRET: &str = "integration-test-secret-long-enough";
pub const BOUNDARY: &str = "video-host-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub assets: TempDir,
    pub staging: TempDir,
    pub tools: TempDir,
}

impl TestApp {
    /// Swap the video destination, e.g. for a failing fake.
    pub fn with_uploader(mut self, uploader: Arc<dyn ObjectUploader>) -> Self {
        self.state.uploader = uploader;
        self.router = app(self.state.clone());
        self
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn seed_video(&self, owner: Uuid) -> Video {
        self.state
            .videos
            .create_video(CreateVideoParams {
                title: "Test video".into(),
                description: "seeded by tests".into(),
                user_id: owner,
            })
            .await
            .unwrap()
    }

    pub async fn reload(&self, id: Uuid) -> Video {
        self.state.videos.get_video(id).await.unwrap()
    }

    pub fn assets_path(&self) -> &Path {
        self.assets.path()
    }

    pub fn staging_path(&self) -> &Path {
        self.staging.path()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_, _| {}).await
}

/// Build an app whose config can be adjusted before the state is wired.
/// The second argument is a scratch directory for helper executables.
pub async fn spawn_app_with(tweak: impl FnOnce(&mut AppConfig, &Path)) -> TestApp {
    let assets = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();

    let env: HashMap<&str, String> = HashMap::from([
        ("VIDEO_HOST_JWT_SECRET", TEST_SECRET.to_string()),
        ("VIDEO_HOST_STORAGE_BACKEND", "local".to_string()),
        ("VIDEO_HOST_ASSETS_ROOT", assets.path().display().to_string()),
        ("VIDEO_HOST_TEMP_DIR", staging.path().display().to_string()),
        ("VIDEO_HOST_FFPROBE_PATH", "false".to_string()),
    ]);
    let (mut cfg, _) =
        AppConfig::from_sources(Args::default(), |key| env.get(key).cloned()).unwrap();
    tweak(&mut cfg, tools.path());

    let pool = db::memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let state = AppState::from_config(Arc::new(cfg), Arc::new(pool))
        .await
        .unwrap();

    TestApp {
        router: app(state.clone()),
        state,
        assets,
        staging,
        tools,
    }
}

pub fn token_for(user: Uuid) -> String {
    make_token(user, TEST_SECRET, Duration::hours(1)).unwrap()
}

/// A one-file multipart body.
pub fn multipart_body(field: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(
    uri: &str,
    token: Option<&str>,
    field: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let body = multipart_body(field, content_type, data);
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Names of all regular files below `dir`, relative to it.
pub fn files_under(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .into_owned(),
                );
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

/// Stand-in for ffprobe that reports one stream of the given size.
///
/// It also fails unless the staged file it is pointed at exists and is
/// non-empty.
#[cfg(unix)]
pub fn fake_ffprobe(dir: &Path, width: u32, height: u32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffprobe");
    let script = format!(
        "#!/bin/sh\n[ -s \"$6\" ] || exit 3\necho '{{\"streams\":[{{\"index\":0,\"width\":{},\"height\":{}}}]}}'\n",
        width, height
    );
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
