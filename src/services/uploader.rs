//! Object storage for uploaded videos.
//!
//! Handlers only see [`ObjectUploader`]; the S3 client and the local
//! [`AssetStore`](crate::services::assets::AssetStore) both implement it.

use async_trait::async_trait;
use aws_sdk_s3::{Client, config::Region, error::DisplayErrorContext, primitives::ByteStream};
use std::io;
use thiserror::Error;
use tokio::fs::File;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("remote upload failed: {0}")]
    Remote(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Destination for uploaded files.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Store `body` (read from its current offset to the end) under `key`
    /// and return the URL it can be fetched from.
    async fn put(&self, body: File, key: &str, content_type: &str) -> UploadResult<String>;
}

/// Uploads to an S3 bucket (or an S3-compatible endpoint).
#[derive(Clone)]
pub struct S3Uploader {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Uploader {
    /// Build a client for `bucket` using the default AWS credential chain.
    ///
    /// A custom `endpoint` (MinIO and friends) switches to path-style
    /// addressing.
    pub async fn new(bucket: String, region: String, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()));
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket,
            region,
            endpoint,
        }
    }

    /// Public URL for an object key.
    pub fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.region, self.endpoint.as_deref(), key)
    }
}

/// `https://<bucket>.s3.<region>.amazonaws.com/<key>`, or
/// `<endpoint>/<bucket>/<key>` when a custom endpoint is configured.
pub fn object_url(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn put(&self, body: File, key: &str, content_type: &str) -> UploadResult<String> {
        let stream = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .map_err(|err| UploadError::Remote(err.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| UploadError::Remote(DisplayErrorContext(&err).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key, "uploaded object");
        Ok(self.object_url(key))
    }
}
