//! Shared handler state.

use crate::{
    config::{AppConfig, StorageBackend},
    services::{
        aspect::AspectProbe,
        assets::AssetStore,
        uploader::{ObjectUploader, S3Uploader},
        video_store::VideoStore,
    },
};
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything a handler needs. Cheap to clone; configuration is read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub videos: VideoStore,
    pub assets: AssetStore,
    pub uploader: Arc<dyn ObjectUploader>,
    pub probe: AspectProbe,
}

impl AppState {
    /// Wire up the stores and pick the video backend named in `config`.
    pub async fn from_config(config: Arc<AppConfig>, db: Arc<SqlitePool>) -> Result<Self> {
        let assets = AssetStore::new(&config.assets_root, config.public_base_url.clone());

        let uploader: Arc<dyn ObjectUploader> = match config.storage_backend {
            StorageBackend::S3 => {
                let bucket = config
                    .s3_bucket
                    .clone()
                    .context("an S3 bucket is required for the s3 storage backend")?;
                tracing::info!(bucket = %bucket, region = %config.s3_region, "using S3 video storage");
                Arc::new(
                    S3Uploader::new(bucket, config.s3_region.clone(), config.s3_endpoint.clone())
                        .await,
                )
            }
            StorageBackend::Local => {
                tracing::info!(root = %assets.root.display(), "using local video storage");
                Arc::new(assets.clone())
            }
        };

        Ok(Self {
            videos: VideoStore::new(db),
            probe: AspectProbe::new(&config.ffprobe_path),
            assets,
            uploader,
            config,
        })
    }
}
