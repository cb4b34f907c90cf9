//! Cache key resolution
//!
//! A resolver maps the URI of every request that goes through the cache onto
//! the key its bytes are stored under. Two URIs that resolve to the same key
//! share one cache entry, which is how signed or session-tagged CDN URLs are
//! made cacheable.

use std::collections::HashSet;
use url::Url;

/// Maps a request URI to a cache key.
#[cfg_attr(test, mockall::automock)]
pub trait CacheKeyResolver: Send + Sync {
    fn resolve_key(&self, uri: &str) -> String;
}

impl<F> CacheKeyResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve_key(&self, uri: &str) -> String {
        self(uri)
    }
}

/// The URI itself is the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriKeyResolver;

impl CacheKeyResolver for UriKeyResolver {
    fn resolve_key(&self, uri: &str) -> String {
        uri.to_string()
    }
}

/// Drops the query string and fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripQueryKeyResolver;

impl CacheKeyResolver for StripQueryKeyResolver {
    fn resolve_key(&self, uri: &str) -> String {
        match Url::parse(uri) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => {
                let end = uri.find(['?', '#']).unwrap_or(uri.len());
                uri[..end].to_string()
            }
        }
    }
}

/// Drops only the named query parameters (expiry stamps, signatures).
#[derive(Debug, Clone, Default)]
pub struct IgnoreQueryParamsKeyResolver {
    ignored: HashSet<String>,
}

impl IgnoreQueryParamsKeyResolver {
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: params.into_iter().map(Into::into).collect(),
        }
    }
}

impl CacheKeyResolver for IgnoreQueryParamsKeyResolver {
    fn resolve_key(&self, uri: &str) -> String {
        let Ok(mut url) = Url::parse(uri) else {
            return uri.to_string();
        };

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !self.ignored.contains(name.as_ref()))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        url.set_fragment(None);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        url.to_string()
    }
}
