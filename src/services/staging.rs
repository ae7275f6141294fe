//! Local staging for single-pass upload streams.
//!
//! A multipart field can only be read once, but a video has to be probed and
//! then uploaded. The field is copied into a named temp file that can be
//! rewound and handed out again. The file is deleted when the
//! [`StagedFile`] is dropped, whatever path the handler exits through.

use std::{
    io::{self, SeekFrom},
    path::Path,
};
use tempfile::TempPath;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeekExt, AsyncWriteExt},
};

const STAGED_PREFIX: &str = "video-host-upload-";

#[derive(Debug)]
pub struct StagedFile {
    file: File,
    path: TempPath,
    len: u64,
}

impl StagedFile {
    /// Create an empty temp file inside `dir`.
    pub fn create_in(dir: &Path, suffix: &str) -> io::Result<Self> {
        let named = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(suffix)
            .tempfile_in(dir)?;
        let (file, path) = named.into_parts();

        Ok(Self {
            file: File::from_std(file),
            path,
            len: 0,
        })
    }

    /// Append everything from `reader` and flush. Returns the bytes copied.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let copied = tokio::io::copy(reader, &mut self.file).await?;
        self.file.flush().await?;
        self.len += copied;
        Ok(copied)
    }

    /// Seek back to the first byte.
    pub async fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    /// A rewound handle for one more full read of the staged bytes.
    ///
    /// The handle shares the file offset with this staging file, and the
    /// file on disk still goes away when `self` is dropped.
    pub async fn reader(&mut self) -> io::Result<File> {
        self.rewind().await?;
        self.file.try_clone().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn staged_bytes_can_be_read_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedFile::create_in(dir.path(), ".mp4").unwrap();

        let mut source: &[u8] = b"frame data";
        assert_eq!(staged.fill_from(&mut source).await.unwrap(), 10);
        assert_eq!(staged.len(), 10);

        for _ in 0..2 {
            let mut reader = staged.reader().await.unwrap();
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.unwrap();
            assert_eq!(buf, b"frame data");
        }
    }

    #[tokio::test]
    async fn temp_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut staged = StagedFile::create_in(dir.path(), ".mp4").unwrap();
            let mut source: &[u8] = b"x";
            staged.fill_from(&mut source).await.unwrap();
            let path = staged.path().to_path_buf();
            assert!(path.exists());
            assert!(
                path.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(STAGED_PREFIX)
            );
            path
        };
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_fails_to_stage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StagedFile::create_in(&dir.path().join("nope"), ".mp4").is_err());
    }
}
