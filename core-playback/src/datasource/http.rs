//! HTTP data source on top of the host [`HttpClient`].

use crate::datasource::{DataSource, DataSourceFactory, DataSpec};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, RedirectPolicy};
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(8_000);

const USER_AGENT: &str = "User-Agent";

/// Configurable factory for [`HttpDataSource`].
///
/// Setters mutate in place; sources created afterwards see the new values,
/// sources already created keep theirs.
#[derive(Clone)]
pub struct HttpDataSourceFactory {
    client: Arc<dyn HttpClient>,
    user_agent: Option<String>,
    default_request_properties: HashMap<String, String>,
    allow_cross_protocol_redirects: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpDataSourceFactory {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            user_agent: None,
            default_request_properties: HashMap::new(),
            allow_cross_protocol_redirects: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the headers sent with every request.
    pub fn set_default_request_properties(
        &mut self,
        properties: HashMap<String, String>,
    ) -> &mut Self {
        self.default_request_properties = properties;
        self
    }

    pub fn set_allow_cross_protocol_redirects(&mut self, allow: bool) -> &mut Self {
        self.allow_cross_protocol_redirects = allow;
        self
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.read_timeout = timeout;
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn default_request_properties(&self) -> &HashMap<String, String> {
        &self.default_request_properties
    }

    pub fn allow_cross_protocol_redirects(&self) -> bool {
        self.allow_cross_protocol_redirects
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn create_http_data_source(&self) -> HttpDataSource {
        HttpDataSource::new(self.clone())
    }
}

impl DataSourceFactory for HttpDataSourceFactory {
    fn create_data_source(&self) -> Box<dyn DataSource> {
        Box::new(self.create_http_data_source())
    }
}

impl fmt::Debug for HttpDataSourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDataSourceFactory")
            .field("user_agent", &self.user_agent)
            .field(
                "default_request_properties",
                &self.default_request_properties.keys().collect::<Vec<_>>(),
            )
            .field(
                "allow_cross_protocol_redirects",
                &self.allow_cross_protocol_redirects,
            )
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// Reads one HTTP resource, honoring the requested byte range.
pub struct HttpDataSource {
    config: HttpDataSourceFactory,
    uri: Option<String>,
    body: Option<ByteStream>,
    pending: Option<Bytes>,
    // Bytes still to drop when the server ignored the Range header
    skip: u64,
    remaining: Option<u64>,
}

impl HttpDataSource {
    fn new(config: HttpDataSourceFactory) -> Self {
        Self {
            config,
            uri: None,
            body: None,
            pending: None,
            skip: 0,
            remaining: None,
        }
    }

    /// Request headers for `spec`: defaults, then per-request headers, then
    /// the user agent.
    pub fn request_headers(&self, spec: &DataSpec) -> HashMap<String, String> {
        let mut headers = self.config.default_request_properties.clone();
        headers.extend(
            spec.http_request_headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        if let Some(user_agent) = &self.config.user_agent {
            headers.insert(USER_AGENT.to_string(), user_agent.clone());
        }
        headers
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }

        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };
        match tokio::time::timeout(self.config.read_timeout, body.next()).await {
            Ok(Some(Ok(chunk))) => Ok(Some(chunk)),
            Ok(Some(Err(e))) => Err(PlaybackError::Bridge(e)),
            Ok(None) => Ok(None),
            Err(_) => Err(PlaybackError::Transport(format!(
                "read timed out after {:?}",
                self.config.read_timeout
            ))),
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    #[instrument(skip(self, spec), fields(uri = %spec.uri, position = spec.position))]
    async fn open(&mut self, spec: &DataSpec) -> Result<Option<u64>> {
        self.close().await;

        let request = HttpRequest::get(spec.uri.clone())
            .headers(self.request_headers(spec))
            .range(spec.position, spec.length)
            .redirect_policy(RedirectPolicy::from_cross_protocol_flag(
                self.config.allow_cross_protocol_redirects,
            ));

        let open_timeout = self.config.connect_timeout + self.config.read_timeout;
        let response = tokio::time::timeout(open_timeout, self.config.client.open_stream(request))
            .await
            .map_err(|_| {
                PlaybackError::Transport(format!(
                    "opening {} timed out after {:?}",
                    spec.uri, open_timeout
                ))
            })??;

        // Range starting at the end of the resource
        if response.status == 416 && spec.position > 0 {
            debug!("Range not satisfiable, treating as end of input");
            self.uri = Some(spec.uri.clone());
            self.remaining = Some(0);
            return Ok(Some(0));
        }

        if !response.is_success() {
            return Err(PlaybackError::HttpStatus {
                status: response.status,
                url: spec.uri.clone(),
            });
        }

        let skip = if response.is_partial() { 0 } else { spec.position };
        let available = response
            .content_length
            .map(|length| length.saturating_sub(skip));
        let remaining = match (spec.length, available) {
            (Some(requested), Some(available)) => Some(requested.min(available)),
            (Some(requested), None) => Some(requested),
            (None, available) => available,
        };

        debug!(
            status = response.status,
            final_url = %response.final_url,
            ?remaining,
            "Opened HTTP source"
        );

        self.uri = Some(spec.uri.clone());
        self.body = Some(response.body);
        self.skip = skip;
        self.remaining = remaining;
        Ok(remaining)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        if max_len == 0 || self.remaining == Some(0) {
            return Ok(None);
        }

        loop {
            let Some(mut chunk) = self.next_chunk().await? else {
                if let Some(outstanding) = self.remaining.filter(|n| *n > 0) {
                    return Err(PlaybackError::Transport(format!(
                        "connection closed with {} bytes outstanding",
                        outstanding
                    )));
                }
                return Ok(None);
            };

            if self.skip > 0 {
                let drop_len = usize::try_from(self.skip)
                    .unwrap_or(usize::MAX)
                    .min(chunk.len());
                let _ = chunk.split_to(drop_len);
                self.skip -= drop_len as u64;
                if chunk.is_empty() {
                    continue;
                }
            }

            let mut take = max_len.min(chunk.len());
            if let Some(remaining) = self.remaining {
                take = take.min(usize::try_from(remaining).unwrap_or(usize::MAX));
            }

            let out = chunk.split_to(take);
            if !chunk.is_empty() && self.remaining.map_or(true, |n| n > take as u64) {
                self.pending = Some(chunk);
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= take as u64;
            }
            return Ok(Some(out));
        }
    }

    async fn close(&mut self) {
        self.body = None;
        self.pending = None;
        self.skip = 0;
        self.remaining = None;
        self.uri = None;
    }

    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}
