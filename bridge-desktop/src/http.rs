//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpStreamResponse, RedirectPolicy},
};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{header::LOCATION, Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const MAX_REDIRECTS: usize = 20;

/// Reqwest-based HTTP client implementation
///
/// Redirects are never followed by reqwest itself. Each request carries its
/// own [`RedirectPolicy`] and the hops are walked here so that a cross-protocol
/// move can be refused per request.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeouts(Duration::from_secs(8), Duration::from_secs(8))
    }

    /// Create a new HTTP client with custom connect and read timeouts
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a preconfigured client. Its own redirect policy should be `none()`.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: &HttpRequest, url: &Url) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, url.clone());

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn map_error(url: &str, e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout(url.to_string())
        } else if e.is_connect() {
            BridgeError::Connection(format!("{}: {}", url, e))
        } else {
            BridgeError::OperationFailed(format!("{}: {}", url, e))
        }
    }

    fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect()
    }

    /// Next hop for a `3xx` response, or `None` when the response is final.
    fn redirect_target(
        policy: RedirectPolicy,
        current: &Url,
        response: &reqwest::Response,
    ) -> Result<Option<Url>> {
        if policy == RedirectPolicy::Disabled || !response.status().is_redirection() {
            return Ok(None);
        }
        let Some(location) = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };
        let next = current.join(location).map_err(|e| {
            BridgeError::OperationFailed(format!("Bad redirect location {}: {}", location, e))
        })?;
        if !policy.allows(current.scheme(), next.scheme()) {
            return Err(BridgeError::RedirectRejected {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        Ok(Some(next))
    }

    /// Send a request and walk redirects until a final response.
    async fn send_following(&self, request: &HttpRequest) -> Result<(Url, reqwest::Response)> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| BridgeError::OperationFailed(format!("{}: {}", request.url, e)))?;

        for hop in 0..=MAX_REDIRECTS {
            let response = self
                .build_request(request, &url)
                .send()
                .await
                .map_err(|e| Self::map_error(url.as_str(), e))?;

            match Self::redirect_target(request.redirect, &url, &response)? {
                Some(next) => {
                    debug!(hop, from = %url, to = %next, "Following redirect");
                    url = next;
                }
                None => return Ok((url, response)),
            }
        }

        Err(BridgeError::OperationFailed(format!(
            "Too many redirects for {}",
            request.url
        )))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn open_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse> {
        let (final_url, response) = self.send_following(&request).await?;

        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);
        let content_length = response.content_length();
        let source = final_url.to_string();

        debug!(status, url = %source, ?content_length, "Opened HTTP stream");

        let body = response
            .bytes_stream()
            .map_err(move |e| Self::map_error(&source, e))
            .boxed();

        Ok(HttpStreamResponse {
            status,
            headers,
            content_length,
            final_url: final_url.to_string(),
            body,
        })
    }
}
