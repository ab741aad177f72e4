//! Gonio Pipeline
//!
//! Runs one measurement over one video:
//!
//! ```text
//! FrameSource ──► LandmarkProvider ──► measure_frame ──► RangeTracker
//!      │                                    │
//!      │                              Annotator (overlay)
//!      ▼                                    ▼
//!   frames ─────────────────────────────► FrameSink ──► output.mp4
//!                                                         │
//!                               AnalysisReport ◄──────────┘
//!                                     │
//!                               ResultConsumer
//! ```
//!
//! A [`MeasurementSession`] owns its decoder, encoder, provider and
//! accumulators exclusively; independent sessions may run concurrently.

pub mod annotate;
pub mod config;
pub mod consumer;
pub mod provider;
pub mod session;
pub mod trace;

pub use config::{AnalysisOverrides, RunConfig, RunRequest};
pub use consumer::{JsonReportWriter, MeasurementLogWriter, ResultConsumer};
pub use provider::{JsonlLandmarkProvider, LandmarkProvider, ProcessLandmarkProvider};
pub use session::{MeasurementSession, SessionState};
pub use trace::{TraceHeader, TraceRecord, TraceWriter};
