//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-runtime`, `core-playback`). Host applications can
//! depend on `player-core-workspace` and enable the documented features without
//! needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_runtime;

#[cfg(any(feature = "desktop-shims", feature = "playback"))]
pub use core_playback;
