//! Gonio Common Utilities
//!
//! Shared infrastructure for all Gonio crates:
//! - Error types and result aliases
//! - Frame clock and throughput utilities for video runs
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
