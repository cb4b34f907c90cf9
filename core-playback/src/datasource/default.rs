use crate::classifier::scheme_of;
use crate::datasource::file::FileDataSource;
use crate::datasource::http::HttpDataSourceFactory;
use crate::datasource::{DataSource, DataSourceFactory, DataSpec};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Routes each request to a file or HTTP source by URI scheme.
#[derive(Debug, Clone)]
pub struct DefaultDataSourceFactory {
    http: HttpDataSourceFactory,
}

impl DefaultDataSourceFactory {
    pub fn new(http: HttpDataSourceFactory) -> Self {
        Self { http }
    }

    pub fn http_factory(&self) -> &HttpDataSourceFactory {
        &self.http
    }
}

impl DataSourceFactory for DefaultDataSourceFactory {
    fn create_data_source(&self) -> Box<dyn DataSource> {
        Box::new(DefaultDataSource {
            http: self.http.clone(),
            current: None,
        })
    }
}

pub struct DefaultDataSource {
    http: HttpDataSourceFactory,
    current: Option<Box<dyn DataSource>>,
}

impl DefaultDataSource {
    fn select(&self, uri: &str) -> Result<Box<dyn DataSource>> {
        match scheme_of(uri).map(str::to_ascii_lowercase).as_deref() {
            None | Some("file") => Ok(Box::new(FileDataSource::default())),
            Some("http") | Some("https") => Ok(self.http.create_data_source()),
            Some(other) => Err(PlaybackError::InvalidArgument(format!(
                "unsupported URI scheme '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl DataSource for DefaultDataSource {
    async fn open(&mut self, spec: &DataSpec) -> Result<Option<u64>> {
        self.close().await;

        let mut source = self.select(&spec.uri)?;
        debug!("Opening {} via default data source", spec.uri);
        let length = source.open(spec).await?;
        self.current = Some(source);
        Ok(length)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        match self.current.as_mut() {
            Some(source) => source.read(max_len).await,
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        if let Some(mut source) = self.current.take() {
            source.close().await;
        }
    }

    fn uri(&self) -> Option<&str> {
        self.current.as_ref().and_then(|source| source.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::read_fully;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpStreamResponse};
    use std::sync::Arc;

    struct OfflineClient;

    #[async_trait]
    impl HttpClient for OfflineClient {
        async fn open_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
            Err(BridgeError::Connection("offline".into()))
        }
    }

    fn factory() -> DefaultDataSourceFactory {
        DefaultDataSourceFactory::new(HttpDataSourceFactory::new(Arc::new(OfflineClient)))
    }

    #[tokio::test]
    async fn test_routes_local_path_to_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"local").unwrap();

        let mut source = factory().create_data_source();
        let spec = DataSpec::new(tmp.path().to_string_lossy().to_string());
        assert_eq!(&read_fully(source.as_mut(), &spec).await.unwrap()[..], b"local");
    }

    #[tokio::test]
    async fn test_routes_http_to_client() {
        let mut source = factory().create_data_source();
        let err = source
            .open(&DataSpec::new("https://cdn.example.com/v.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_network_error());
    }

    #[tokio::test]
    async fn test_drive_path_routes_to_file() {
        let mut source = factory().create_data_source();
        let err = source
            .open(&DataSpec::new(r"C:\media\missing.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Io(_)));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let mut source = factory().create_data_source();
        let err = source
            .open(&DataSpec::new("ftp://example.com/v.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidArgument(_)));
    }
}
