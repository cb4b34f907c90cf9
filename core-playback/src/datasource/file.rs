use crate::datasource::{DataSource, DataSourceFactory, DataSpec};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use url::Url;

/// Creates [`FileDataSource`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDataSourceFactory;

impl DataSourceFactory for FileDataSourceFactory {
    fn create_data_source(&self) -> Box<dyn DataSource> {
        Box::new(FileDataSource::default())
    }
}

/// Reads a local file given as a `file://` URL or an absolute path.
#[derive(Debug, Default)]
pub struct FileDataSource {
    file: Option<File>,
    uri: Option<String>,
    remaining: u64,
}

/// Filesystem path for a `file://` URL or a plain path.
pub fn local_path(uri: &str) -> Result<PathBuf> {
    if uri.starts_with("file:") {
        let url = Url::parse(uri)
            .map_err(|e| PlaybackError::InvalidArgument(format!("bad file URL '{}': {}", uri, e)))?;
        url.to_file_path()
            .map_err(|_| PlaybackError::InvalidArgument(format!("not a local file URL: {}", uri)))
    } else {
        Ok(PathBuf::from(uri))
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn open(&mut self, spec: &DataSpec) -> Result<Option<u64>> {
        self.close().await;

        let path = local_path(&spec.uri)?;
        let mut file = File::open(&path).await?;
        let file_len = file.metadata().await?.len();
        if spec.position > file_len {
            return Err(PlaybackError::InvalidArgument(format!(
                "position {} beyond end of {} ({} bytes)",
                spec.position,
                path.display(),
                file_len
            )));
        }
        if spec.position > 0 {
            file.seek(SeekFrom::Start(spec.position)).await?;
        }

        let available = file_len - spec.position;
        self.remaining = spec.length.map_or(available, |length| length.min(available));
        self.file = Some(file);
        self.uri = Some(spec.uri.clone());
        Ok(Some(self.remaining))
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };
        if self.remaining == 0 || max_len == 0 {
            return Ok(None);
        }

        let want = max_len.min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let mut buf = BytesMut::zeroed(want);
        let n = file.read(&mut buf[..]).await?;
        if n == 0 {
            return Err(PlaybackError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("file shrank with {} bytes outstanding", self.remaining),
            )));
        }

        buf.truncate(n);
        self.remaining -= n as u64;
        Ok(Some(buf.freeze()))
    }

    async fn close(&mut self) {
        self.file = None;
        self.uri = None;
        self.remaining = 0;
    }

    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}
