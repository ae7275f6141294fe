use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf, str::FromStr};

pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 1 << 30;
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

/// Where uploaded videos end up.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Remote S3 (or S3-compatible) bucket.
    S3,
    /// Files under the local assets root, served by `/assets`.
    Local,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments. Built once at startup
/// and shared read-only with every handler.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub assets_root: PathBuf,
    pub public_base_url: String,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub ffprobe_path: PathBuf,
    pub temp_dir: PathBuf,
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video hosting upload API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_HOST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_HOST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_HOST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for thumbnails and locally stored videos (overrides VIDEO_HOST_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Base URL used when building asset links (overrides VIDEO_HOST_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// HMAC secret for access tokens (overrides VIDEO_HOST_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Video storage backend (overrides VIDEO_HOST_STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Bucket for uploaded videos (overrides VIDEO_HOST_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides VIDEO_HOST_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3-compatible endpoint (overrides VIDEO_HOST_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// ffprobe executable (overrides VIDEO_HOST_FFPROBE_PATH)
    #[arg(long)]
    pub ffprobe_path: Option<PathBuf>,

    /// Directory for staged uploads (overrides VIDEO_HOST_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Maximum video request body in bytes (overrides VIDEO_HOST_MAX_VIDEO_BYTES)
    #[arg(long)]
    pub max_video_bytes: Option<u64>,

    /// Maximum thumbnail request body in bytes (overrides VIDEO_HOST_MAX_THUMBNAIL_BYTES)
    #[arg(long)]
    pub max_thumbnail_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_sources(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge already-parsed CLI args over values found through `lookup`.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Environment fallback ---
        let env_host = lookup("VIDEO_HOST_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "VIDEO_HOST_PORT", 8091u16)?;
        let env_db = lookup("VIDEO_HOST_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/video_host.db".into());
        let env_assets = lookup("VIDEO_HOST_ASSETS_ROOT").unwrap_or_else(|| "./assets".into());
        let env_backend = match lookup("VIDEO_HOST_STORAGE_BACKEND") {
            Some(value) => <StorageBackend as ValueEnum>::from_str(&value, true).map_err(|err| {
                anyhow::anyhow!("parsing VIDEO_HOST_STORAGE_BACKEND value `{}`: {}", value, err)
            })?,
            None => StorageBackend::S3,
        };
        let env_region = lookup("VIDEO_HOST_S3_REGION").unwrap_or_else(|| "us-east-1".into());
        let env_ffprobe = lookup("VIDEO_HOST_FFPROBE_PATH").unwrap_or_else(|| "ffprobe".into());
        let env_max_video =
            parse_var(&lookup, "VIDEO_HOST_MAX_VIDEO_BYTES", DEFAULT_MAX_VIDEO_BYTES)?;
        let env_max_thumbnail = parse_var(
            &lookup,
            "VIDEO_HOST_MAX_THUMBNAIL_BYTES",
            DEFAULT_MAX_THUMBNAIL_BYTES,
        )?;

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let jwt_secret = args
            .jwt_secret
            .or_else(|| lookup("VIDEO_HOST_JWT_SECRET"))
            .filter(|secret| !secret.is_empty())
            .context("VIDEO_HOST_JWT_SECRET must be set")?;
        let public_base_url = args
            .public_base_url
            .or_else(|| lookup("VIDEO_HOST_PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            assets_root: args.assets_root.unwrap_or_else(|| env_assets.into()),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            jwt_secret,
            storage_backend: args.storage_backend.unwrap_or(env_backend),
            s3_bucket: args.s3_bucket.or_else(|| lookup("VIDEO_HOST_S3_BUCKET")),
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_endpoint: args.s3_endpoint.or_else(|| lookup("VIDEO_HOST_S3_ENDPOINT")),
            ffprobe_path: args.ffprobe_path.unwrap_or_else(|| env_ffprobe.into()),
            temp_dir: args
                .temp_dir
                .or_else(|| lookup("VIDEO_HOST_TEMP_DIR").map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            max_video_bytes: args.max_video_bytes.unwrap_or(env_max_video),
            max_thumbnail_bytes: args.max_thumbnail_bytes.unwrap_or(env_max_thumbnail),
        };

        if cfg.storage_backend == StorageBackend::S3 && cfg.s3_bucket.is_none() {
            bail!("VIDEO_HOST_S3_BUCKET must be set when the storage backend is s3");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("assets_root", &self.assets_root)
            .field("public_base_url", &self.public_base_url)
            .field("jwt_secret", &"<redacted>")
            .field("storage_backend", &self.storage_backend)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("temp_dir", &self.temp_dir)
            .field("max_video_bytes", &self.max_video_bytes)
            .field("max_thumbnail_bytes", &self.max_thumbnail_bytes)
            .finish()
    }
}

fn parse_var<F, T>(env: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env(key) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}
