//! Gonio Video
//!
//! Frame-level video I/O and annotation:
//!
//! ```text
//! input.mp4 ── ffmpeg (rawvideo rgb24) ──► FrameSource ──► frames
//!                                                            │
//!                                               draw_overlay │
//!                                                            ▼
//! output.mp4 ◄── ffmpeg (encode) ◄── FrameSink ◄── annotated frames
//! ```
//!
//! Backends sit behind [`VideoBackend`] so runs can be driven by ffmpeg
//! subprocesses or by in-memory frames in tests.

pub mod ffmpeg;
pub mod overlay;
pub mod stream;

pub use ffmpeg::{command_exists, FfmpegBackend};
pub use overlay::{Annotator, FrameOverlay, MeasurementMark};
pub use stream::*;
