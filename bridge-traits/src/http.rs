//! HTTP Client Abstraction
//!
//! The network leaf of the data-source chain. The core builds requests (headers,
//! byte ranges, redirect policy) and the host decides how bytes travel.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// How an implementation may follow `3xx` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Return the redirect response as-is.
    Disabled,
    /// Follow redirects that keep the scheme (`http` -> `http`, `https` -> `https`).
    #[default]
    SameProtocol,
    /// Follow redirects across schemes as well.
    CrossProtocol,
}

impl RedirectPolicy {
    pub fn from_cross_protocol_flag(allow_cross_protocol: bool) -> Self {
        if allow_cross_protocol {
            RedirectPolicy::CrossProtocol
        } else {
            RedirectPolicy::SameProtocol
        }
    }

    /// Whether a redirect from `from_scheme` to `to_scheme` may be followed.
    pub fn allows(&self, from_scheme: &str, to_scheme: &str) -> bool {
        match self {
            RedirectPolicy::Disabled => false,
            RedirectPolicy::SameProtocol => from_scheme.eq_ignore_ascii_case(to_scheme),
            RedirectPolicy::CrossProtocol => true,
        }
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub redirect: RedirectPolicy,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
            redirect: RedirectPolicy::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Merge a header map; later entries overwrite earlier ones.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in headers {
            self.headers.insert(key.into(), value.into());
        }
        self
    }

    /// Request a byte range starting at `position`.
    ///
    /// Nothing is added for an unbounded request from the start of the resource.
    pub fn range(self, position: u64, length: Option<u64>) -> Self {
        match (position, length) {
            (0, None) => self,
            (start, None) => self.header("Range", format!("bytes={}-", start)),
            (start, Some(len)) => {
                let end = start + len.saturating_sub(1);
                self.header("Range", format!("bytes={}-{}", start, end))
            }
        }
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = policy;
        self
    }
}

/// Body chunks of a streamed response.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Response whose body is consumed incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Value of `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    /// URL after redirects were followed.
    pub final_url: String,
    pub body: ByteStream,
}

impl HttpStreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `206 Partial Content`: the server honoured the `Range` header.
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for HttpStreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .field("final_url", &self.final_url)
            .finish_non_exhaustive()
    }
}

/// Async HTTP client trait
///
/// Implementations own connection pooling, TLS and redirect handling. Media
/// bytes are always consumed as a stream; the core never buffers a body.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a request and hand back the body as a stream of chunks.
    ///
    /// Redirects are followed according to `request.redirect`. Non-2xx statuses
    /// are returned to the caller, who decides how to surface them.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails, the request times out or the
    /// redirect policy rejects a hop.
    async fn open_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/v.mp4")
            .header("User-Agent", "test")
            .headers([("X-Token", "abc")])
            .timeout(Duration::from_secs(30))
            .redirect_policy(RedirectPolicy::CrossProtocol);

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "https://example.com/v.mp4");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.headers.get("X-Token"), Some(&"abc".to_string()));
        assert_eq!(request.redirect, RedirectPolicy::CrossProtocol);
    }

    #[test]
    fn test_range_header() {
        let whole = HttpRequest::get("http://x/v").range(0, None);
        assert!(!whole.headers.contains_key("Range"));

        let open_ended = HttpRequest::get("http://x/v").range(100, None);
        assert_eq!(open_ended.headers.get("Range").unwrap(), "bytes=100-");

        let bounded = HttpRequest::get("http://x/v").range(100, Some(50));
        assert_eq!(bounded.headers.get("Range").unwrap(), "bytes=100-149");
    }

    #[test]
    fn test_redirect_policy() {
        assert!(RedirectPolicy::SameProtocol.allows("https", "https"));
        assert!(!RedirectPolicy::SameProtocol.allows("http", "https"));
        assert!(RedirectPolicy::CrossProtocol.allows("http", "https"));
        assert!(!RedirectPolicy::Disabled.allows("http", "http"));
        assert_eq!(
            RedirectPolicy::from_cross_protocol_flag(true),
            RedirectPolicy::CrossProtocol
        );
    }

    #[test]
    fn test_stream_response_helpers() {
        use futures::StreamExt;

        let response = HttpStreamResponse {
            status: 206,
            headers: HashMap::from([(
                "Content-Range".to_string(),
                "bytes 0-9/100".to_string(),
            )]),
            content_length: Some(10),
            final_url: "https://x/v".to_string(),
            body: futures::stream::empty().boxed(),
        };

        assert!(response.is_success());
        assert!(response.is_partial());
        assert_eq!(response.header("content-range"), Some("bytes 0-9/100"));
    }
}
