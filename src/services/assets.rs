//! src/services/assets.rs
//!
//! AssetStore — writes uploaded bytes beneath the local assets root, which
//! the router serves at `/assets`. Thumbnails always land here; videos do
//! too when the local storage backend is selected.

use crate::services::uploader::{ObjectUploader, UploadError, UploadResult};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncWriteExt},
};
use tracing::debug;
use uuid::Uuid;

const MAX_ASSET_KEY_LEN: usize = 1024;
const RANDOM_NAME_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct AssetStore {
    /// Directory on disk holding every asset.
    pub root: PathBuf,

    /// Base URL the assets are reachable under, without trailing slash.
    pub base_url: String,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Public URL for an asset key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/assets/{}", self.base_url, key)
    }

    /// Full on-disk path for an asset key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Copy `reader` to `<root>/<key>`, replacing any existing file.
    ///
    /// Bytes go to a hidden temp file in the destination directory first and
    /// are renamed into place once flushed, so readers never see a partial
    /// asset. Returns the number of bytes written.
    pub async fn write<R>(&self, key: &str, reader: &mut R) -> UploadResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        ensure_key_safe(key)?;
        let file_path = self.path_for(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("asset path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        match copy_to(&tmp_path, reader).await {
            Ok(size) => {
                if let Err(err) = fs::rename(&tmp_path, &file_path).await {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(err.into());
                }
                debug!("wrote {} bytes to {}", size, file_path.display());
                Ok(size)
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(err.into())
            }
        }
    }
}

async fn copy_to<R>(path: &Path, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = File::create(path).await?;
    let size = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(size)
}

#[async_trait]
impl ObjectUploader for AssetStore {
    async fn put(&self, mut body: File, key: &str, _content_type: &str) -> UploadResult<String> {
        self.write(key, &mut body).await?;
        Ok(self.url_for(key))
    }
}

/// Basic key validation to avoid trivial path traversal vectors.
///
/// Rejects empty or overlong keys, keys that begin with `/`, contain `..`,
/// backslashes or control characters.
pub fn ensure_key_safe(key: &str) -> UploadResult<()> {
    if key.is_empty() || key.len() > MAX_ASSET_KEY_LEN {
        return Err(UploadError::InvalidKey(key.to_string()));
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(UploadError::InvalidKey(key.to_string()));
    }
    if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return Err(UploadError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
///
/// Used as a content key; collisions are not checked.
pub fn random_name() -> Result<String, rand::rand_core::OsError> {
    let mut buf = [0u8; RANDOM_NAME_BYTES];
    OsRng.try_fill_bytes(&mut buf)?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_names_are_url_safe_and_distinct() {
        let a = random_name().unwrap();
        let b = random_name().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn unsafe_keys_are_rejected() {
        for key in ["", "/etc/passwd", "../up.png", "a/../b.png", "a\\b.png", "a\nb.png"] {
            assert!(ensure_key_safe(key).is_err(), "{key:?} should be rejected");
        }
        assert!(ensure_key_safe("landscape/abc.mp4").is_ok());
    }

    #[tokio::test]
    async fn write_creates_nested_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "http://localhost:8091");

        let mut body: &[u8] = b"not really a video";
        let size = store.write("portrait/clip.mp4", &mut body).await.unwrap();

        assert_eq!(size, 18);
        let on_disk = fs::read(dir.path().join("portrait/clip.mp4")).await.unwrap();
        assert_eq!(on_disk, b"not really a video");

        let mut entries = fs::read_dir(dir.path().join("portrait")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["clip.mp4".to_string()]);
    }

    #[tokio::test]
    async fn write_overwrites_existing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "http://localhost:8091");

        let mut first: &[u8] = b"first";
        store.write("thumb.png", &mut first).await.unwrap();
        let mut second: &[u8] = b"second";
        store.write("thumb.png", &mut second).await.unwrap();

        assert_eq!(fs::read(dir.path().join("thumb.png")).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn put_returns_assets_url() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.mp4");
        fs::write(&src, b"bytes").await.unwrap();
        let store = AssetStore::new(dir.path().join("assets"), "http://localhost:8091");

        let file = File::open(&src).await.unwrap();
        let url = store.put(file, "other/xyz.mp4", "video/mp4").await.unwrap();

        assert_eq!(url, "http://localhost:8091/assets/other/xyz.mp4");
        assert_eq!(
            fs::read(dir.path().join("assets/other/xyz.mp4")).await.unwrap(),
            b"bytes"
        );
    }
}
