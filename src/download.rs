//! Save the image of a [`PostRecord`] to disk.

use std::path::{Path, PathBuf};

use log::info;
use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::api::data::PostRecord;
use crate::error::{Error, Result};
use crate::hash::md5_matches;
use crate::transport::Transport;

/// What [`Downloader::save`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downloaded {
    /// The image was fetched and written to this path.
    Done(PathBuf),
    /// A file with the same name and MD5 was already there, nothing was fetched.
    Existed(PathBuf),
}

impl Downloaded {
    /// Where the image is on disk.
    pub fn path(&self) -> &Path {
        match self {
            Self::Done(path) | Self::Existed(path) => path,
        }
    }
}

/// Writes images into a single download directory.
pub struct Downloader<'a, T> {
    transport: &'a T,
    download_dir: PathBuf,
}

impl<'a, T: Transport> Downloader<'a, T> {
    /// A downloader writing into `download_dir`. Nothing is created until [`Self::ensure`].
    pub fn session(transport: &'a T, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            download_dir: download_dir.into(),
        }
    }

    /// Create the download directory and all of its parents if they are missing.
    #[inline]
    pub async fn ensure(self) -> Result<Self> {
        create_dir_all(&self.download_dir)
            .await
            .map_err(Error::file_write(&self.download_dir))?;
        Ok(self)
    }

    /// The directory images are written into.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Fetch the image of `record` and write it to `<download_dir>/<image>`.
    ///
    /// The fetch is skipped if that file already exists with the MD5 of `record.hash`.
    pub async fn save(&self, record: &PostRecord) -> Result<Downloaded> {
        let filename = record.file_name().ok_or(Error::InvalidRecord {
            id: record.id,
            reason: "the image has no file name",
        })?;
        let filepath = self.download_dir.join(filename);

        if md5_matches(&filepath, &record.hash)
            .await
            .map_err(Error::file_write(&filepath))?
        {
            info!("{} already exists, skipping", filepath.display());
            return Ok(Downloaded::Existed(filepath));
        }

        let url = record.image_url()?;
        let body = self.transport.fetch_bytes(&url).await?;
        if body.is_empty() {
            return Err(Error::EmptyImage(url));
        }

        write_file(&filepath, &body)
            .await
            .map_err(Error::file_write(&filepath))?;
        info!("saved post {} to {}", record.id, filepath.display());
        Ok(Downloaded::Done(filepath))
    }
}

async fn write_file(filepath: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file_buf = BufWriter::new(File::create(filepath).await?);
    file_buf.write_all(content).await?;
    file_buf.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::data::tests::record;
    use crate::transport::mock::MockTransport;

    const CONTENT: &str = "The quick brown fox jumps over the lazy dog";
    const MD5: &str = "9e107d9d372bb6826bd81d3542a419d6";

    #[tokio::test]
    async fn test_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let record = record(1, "fox.jpg", "wrong md5");
        let transport = MockTransport::default().route(record.image_url().unwrap(), CONTENT);

        let downloader = Downloader::session(&transport, temp_dir.path().join("a/b"))
            .ensure()
            .await
            .unwrap();
        let downloaded = downloader.save(&record).await.unwrap();

        let expected = temp_dir.path().join("a/b/fox.jpg");
        assert_eq!(downloaded, Downloaded::Done(expected.clone()));
        assert_eq!(std::fs::read(expected).unwrap(), CONTENT.as_bytes());

        temp_dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_skip_existed() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("fox.jpg"), CONTENT).unwrap();
        // no route: any fetch would fail
        let transport = MockTransport::default();

        let downloader = Downloader::session(&transport, temp_dir.path());
        let downloaded = downloader
            .save(&record(1, "fox.jpg", MD5))
            .await
            .unwrap();

        assert!(matches!(downloaded, Downloaded::Existed(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_stale_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let filepath = temp_dir.path().join("fox.jpg");
        std::fs::write(&filepath, "stale").unwrap();
        let record = record(1, "fox.jpg", MD5);
        let transport = MockTransport::default().route(record.image_url().unwrap(), CONTENT);

        let downloaded = Downloader::session(&transport, temp_dir.path())
            .save(&record)
            .await
            .unwrap();

        assert_eq!(downloaded.path(), filepath);
        assert_eq!(std::fs::read(filepath).unwrap(), CONTENT.as_bytes());
    }

    #[tokio::test]
    async fn test_empty_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let record = record(1, "fox.jpg", MD5);
        let transport = MockTransport::default().route(record.image_url().unwrap(), "");

        let err = Downloader::session(&transport, temp_dir.path())
            .save(&record)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyImage(_)));
        assert!(!temp_dir.path().join("fox.jpg").exists());
    }

    #[tokio::test]
    async fn test_missing_dir_is_write_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let record = record(1, "fox.jpg", MD5);
        let transport = MockTransport::default().route(record.image_url().unwrap(), CONTENT);

        // `ensure` was never called
        let err = Downloader::session(&transport, temp_dir.path().join("missing"))
            .save(&record)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
    }

    #[tokio::test]
    async fn test_image_without_file_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::default();

        let err = Downloader::session(&transport, temp_dir.path())
            .save(&record(7, "..", MD5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { id: 7, .. }));
    }
}
