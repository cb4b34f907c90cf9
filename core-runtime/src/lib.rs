//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback core:
//! - Logging and tracing initialisation
//! - Configuration management (`CoreConfig` and its builder)
//! - Event bus for playback, cache and source-resolution events
//!
//! ## Overview
//!
//! Nothing in here knows about media. The playback crate pulls its HTTP
//! client, clock, cache root and event bus out of a validated [`CoreConfig`]
//! and logs through the subscriber installed by [`logging::init_logging`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
