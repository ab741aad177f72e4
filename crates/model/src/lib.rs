//! Gonio Model
//!
//! Defines the core data contracts for range-of-motion measurement:
//! - **Points:** 2D coordinates in normalized or pixel space
//! - **Landmarks:** Per-frame pose and hand detections from a landmark provider
//! - **Movement:** Movement kind, body side, and per-run measurement constants
//! - **Report:** The aggregate result handed to the persistence layer
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the frame,
//! with `y` growing downward.

pub mod error;
pub mod landmark;
pub mod movement;
pub mod point;
pub mod report;

pub use error::*;
pub use landmark::*;
pub use movement::*;
pub use point::*;
pub use report::*;
