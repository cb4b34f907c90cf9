//! Caller-supplied HTTP headers onto an HTTP data source factory.

use crate::datasource::http::HttpDataSourceFactory;
use core_runtime::logging::redact_if_sensitive;
use std::collections::HashMap;
use tracing::debug;

/// Header name routed to the factory's user agent instead of the default
/// request properties. Matched case-sensitively.
pub const USER_AGENT_HEADER: &str = "User-Agent";

/// Applies a header map to an [`HttpDataSourceFactory`].
pub struct HeaderInjector;

impl HeaderInjector {
    /// No-op for `None` or an empty map.
    ///
    /// A non-empty `User-Agent` entry becomes the factory's user agent; every
    /// other entry (an empty `User-Agent` included) replaces the factory's
    /// default request properties.
    pub fn apply(headers: Option<&HashMap<String, String>>, factory: &mut HttpDataSourceFactory) {
        let Some(headers) = headers.filter(|h| !h.is_empty()) else {
            return;
        };

        let mut properties = headers.clone();
        let has_user_agent = properties
            .get(USER_AGENT_HEADER)
            .is_some_and(|value| !value.is_empty());
        if has_user_agent {
            if let Some(user_agent) = properties.remove(USER_AGENT_HEADER) {
                debug!(user_agent = %user_agent, "Overriding user agent");
                factory.set_user_agent(user_agent);
            }
        }

        for (name, value) in &properties {
            debug!(header = %name, value = %redact_if_sensitive(name, value), "Request property");
        }
        factory.set_default_request_properties(properties);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpStreamResponse};
    use std::sync::Arc;

    struct NoopClient;

    #[async_trait]
    impl HttpClient for NoopClient {
        async fn open_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
            Err(BridgeError::NotAvailable("noop".into()))
        }
    }

    fn factory() -> HttpDataSourceFactory {
        let mut factory = HttpDataSourceFactory::new(Arc::new(NoopClient));
        factory.set_user_agent("baseline/1.0");
        factory
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_user_agent_is_routed() {
        let mut factory = factory();
        HeaderInjector::apply(
            Some(&map(&[("User-Agent", "UA1"), ("X-Token", "abc")])),
            &mut factory,
        );

        assert_eq!(factory.user_agent(), Some("UA1"));
        assert_eq!(factory.default_request_properties(), &map(&[("X-Token", "abc")]));
    }

    #[test]
    fn test_empty_user_agent_stays_a_property() {
        let mut factory = factory();
        HeaderInjector::apply(Some(&map(&[("User-Agent", "")])), &mut factory);

        assert_eq!(factory.user_agent(), Some("baseline/1.0"));
        assert_eq!(factory.default_request_properties(), &map(&[("User-Agent", "")]));
    }

    #[test]
    fn test_user_agent_match_is_case_sensitive() {
        let mut factory = factory();
        HeaderInjector::apply(Some(&map(&[("user-agent", "lower")])), &mut factory);

        assert_eq!(factory.user_agent(), Some("baseline/1.0"));
        assert!(factory.default_request_properties().contains_key("user-agent"));
    }

    #[test]
    fn test_none_and_empty_are_noops() {
        let mut factory = factory();
        factory.set_default_request_properties(map(&[("Referer", "https://app/")]));

        HeaderInjector::apply(None, &mut factory);
        HeaderInjector::apply(Some(&HashMap::new()), &mut factory);

        assert_eq!(factory.user_agent(), Some("baseline/1.0"));
        assert_eq!(
            factory.default_request_properties(),
            &map(&[("Referer", "https://app/")])
        );
    }

    #[test]
    fn test_properties_are_replaced() {
        let mut factory = factory();
        HeaderInjector::apply(Some(&map(&[("A", "1")])), &mut factory);
        HeaderInjector::apply(Some(&map(&[("B", "2")])), &mut factory);

        assert_eq!(factory.default_request_properties(), &map(&[("B", "2")]));
    }
}
