//! # Host Bridge Traits
//!
//! Capability contracts the playback core needs from its host.
//!
//! ## Overview
//!
//! The core never talks to sockets, wall clocks or host log pipelines directly.
//! Each of those concerns is expressed as a trait here and implemented per
//! platform (`bridge-desktop` ships the desktop versions).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - request execution and streaming bodies,
//!   the network leaf of every data-source chain
//! - [`Clock`](time::Clock) - time source, injectable for deterministic cache tests
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the URL or path in the
//! message so failures can be traced back to a request.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; bridges are shared across player
//! instances and engine I/O tasks through `Arc`.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpStreamResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient;
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn open_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod log;
pub mod time;

pub use error::BridgeError;

pub use http::{
    ByteStream, HttpClient, HttpMethod, HttpRequest, HttpStreamResponse, RedirectPolicy,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use time::{Clock, ManualClock, SystemClock};
