//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`, with redirects followed under the
//!   per-request [`RedirectPolicy`](bridge_traits::RedirectPolicy)
//! - cache directory discovery using `dirs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_cache_root, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let cache_root = default_cache_root("my-player");
//! ```

mod http;
mod paths;

pub use http::ReqwestHttpClient;
pub use paths::default_cache_root;
