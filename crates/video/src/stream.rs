//! Frame stream abstractions.

use std::path::{Path, PathBuf};

use gonio_common::error::{GonioError, GonioResult};
use gonio_model::point::FrameSize;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// One decoded RGB frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Zero-based index in the source stream.
    pub index: u64,
    pub image: RgbImage,
}

impl VideoFrame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(index: u64, size: FrameSize, bytes: Vec<u8>) -> GonioResult<Self> {
        let len = bytes.len();
        let image = RgbImage::from_raw(size.width, size.height, bytes).ok_or_else(|| {
            GonioError::video(format!(
                "frame {index}: {len} bytes do not fill {}x{} RGB",
                size.width, size.height
            ))
        })?;
        Ok(Self { index, image })
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }

    /// Packed RGB24 bytes.
    pub fn as_rgb(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Stream properties reported by a probe or an opened source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, when the container reports one.
    pub fps: Option<f64>,
    /// Frame count, when the container reports one.
    pub frame_count: Option<u64>,
    pub duration_secs: Option<f64>,
}

impl VideoInfo {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Output stream parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    pub path: PathBuf,
    pub size: FrameSize,
    pub fps: f64,
}

/// A decoded frame stream.
pub trait FrameSource: Send {
    fn info(&self) -> VideoInfo;

    /// Next frame in order, `None` at end of stream.
    fn next_frame(&mut self) -> GonioResult<Option<VideoFrame>>;
}

/// An encoded output stream.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &VideoFrame) -> GonioResult<()>;

    /// Flush and close. Dropping a sink without finishing abandons the output.
    fn finish(&mut self) -> GonioResult<()>;
}

/// Opens sources and sinks (ffmpeg, in-memory, ...).
pub trait VideoBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend can run on this system.
    fn is_available(&self) -> bool;

    fn probe(&self, path: &Path) -> GonioResult<VideoInfo>;

    fn open_source(&self, path: &Path) -> GonioResult<Box<dyn FrameSource>>;

    fn open_sink(&self, spec: &SinkSpec) -> GonioResult<Box<dyn FrameSink>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_rgb_checks_length() {
        let size = FrameSize::new(2, 2);
        let frame = VideoFrame::from_rgb(0, size, vec![7; 12]).unwrap();
        assert_eq!(frame.size(), size);
        assert_eq!(frame.as_rgb().len(), size.rgb_len());

        let err = VideoFrame::from_rgb(1, size, vec![0; 5]).unwrap_err();
        assert!(err.to_string().contains("frame 1"));
    }
}
