//! # Data Sources
//!
//! Pull-based byte readers the playback engine opens per request.
//!
//! A chain is assembled from factories:
//!
//! ```text
//! CacheDataSourceFactory ──upstream──> DefaultDataSourceFactory
//!                                           ├── file / bare path ──> FileDataSource
//!                                           └── http(s)          ──> HttpDataSource
//! ```
//!
//! Every source follows the same lifecycle: `open` once, `read` until `None`,
//! then `close`. A closed source may be opened again with a new spec.

pub mod cache;
pub mod default;
pub mod file;
pub mod http;

pub use cache::{CacheDataSource, CacheDataSourceFactory, CacheFlags};
pub use default::{DefaultDataSource, DefaultDataSourceFactory};
pub use file::{FileDataSource, FileDataSourceFactory};
pub use http::{HttpDataSource, HttpDataSourceFactory};

use crate::error::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::fmt;

/// Default read size used by [`read_fully`].
pub const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Describes one read request against a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSpec {
    pub uri: String,
    /// Byte offset to start at
    pub position: u64,
    /// Number of bytes to read; `None` reads to the end
    pub length: Option<u64>,
    /// Explicit cache key; used when no key resolver is configured
    pub key: Option<String>,
    /// Extra headers for this request only
    pub http_request_headers: HashMap<String, String>,
}

impl DataSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            position: 0,
            length: None,
            key: None,
            http_request_headers: HashMap::new(),
        }
    }

    pub fn with_position(mut self, position: u64) -> Self {
        self.position = position;
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_request_headers.insert(name.into(), value.into());
        self
    }

    /// The same request advanced by `offset` bytes.
    pub fn subrange(&self, offset: u64) -> Self {
        let mut spec = self.clone();
        spec.position = self.position + offset;
        spec.length = self.length.map(|length| length.saturating_sub(offset));
        spec
    }

    /// True for a request that starts at 0 and runs to the end.
    pub fn is_whole_resource(&self) -> bool {
        self.position == 0 && self.length.is_none()
    }
}

/// A readable byte source.
#[async_trait]
pub trait DataSource: Send {
    /// Open for `spec`. Returns the number of bytes that will be read, when known.
    async fn open(&mut self, spec: &DataSpec) -> Result<Option<u64>>;

    /// Next chunk of at most `max_len` bytes; `None` at end of input.
    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>>;

    /// Release the underlying resource. Safe to call when not open.
    async fn close(&mut self);

    /// URI of the open request.
    fn uri(&self) -> Option<&str>;
}

/// Creates fresh [`DataSource`] instances; one per engine request.
pub trait DataSourceFactory: Send + Sync + fmt::Debug {
    fn create_data_source(&self) -> Box<dyn DataSource>;
}

/// Open `spec`, read everything, close.
pub async fn read_fully(source: &mut dyn DataSource, spec: &DataSpec) -> Result<Bytes> {
    let expected = source.open(spec).await?;
    let mut out = BytesMut::with_capacity(
        expected
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_READ_CHUNK),
    );

    let result = loop {
        match source.read(DEFAULT_READ_CHUNK).await {
            Ok(Some(chunk)) => out.extend_from_slice(&chunk),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    source.close().await;
    result.map(|_| out.freeze())
}
