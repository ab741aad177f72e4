//! Landmark providers.
//!
//! A provider turns one decoded frame into zero or more named landmarks.
//! Pose estimation itself happens outside this crate: either precomputed
//! into a JSONL file ([`JsonlLandmarkProvider`]) or computed live by an
//! external detector process ([`ProcessLandmarkProvider`]).

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use gonio_common::error::{GonioError, GonioResult};
use gonio_model::landmark::{parse_landmark_frames, DetectionMode, LandmarkFrame};
use gonio_video::VideoFrame;
use serde::Serialize;

/// Source of per-frame landmarks.
pub trait LandmarkProvider: Send {
    fn name(&self) -> &str;

    /// Landmarks for one frame, `None` when nothing was detected.
    ///
    /// Errors are fatal for the run.
    fn detect(&mut self, frame: &VideoFrame, mode: DetectionMode)
        -> GonioResult<Option<LandmarkFrame>>;
}

/// Replays precomputed landmarks keyed by frame index.
#[derive(Debug, Clone, Default)]
pub struct JsonlLandmarkProvider {
    frames: HashMap<u64, LandmarkFrame>,
    source: Option<PathBuf>,
}

impl JsonlLandmarkProvider {
    pub fn from_frames(frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            frames: frames.into_iter().map(|f| (f.frame, f)).collect(),
            source: None,
        }
    }

    /// Load a landmark stream. Later lines win on duplicate frame indices.
    pub fn from_path(path: &Path) -> GonioResult<Self> {
        if !path.exists() {
            return Err(GonioError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let frames = parse_landmark_frames(&content).map_err(|e| {
            GonioError::landmark(format!("Failed to parse {}: {e}", path.display()))
        })?;
        tracing::info!(
            path = %path.display(),
            frames = frames.len(),
            "Loaded landmark stream"
        );
        let mut provider = Self::from_frames(frames);
        provider.source = Some(path.to_path_buf());
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkProvider for JsonlLandmarkProvider {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn detect(
        &mut self,
        frame: &VideoFrame,
        mode: DetectionMode,
    ) -> GonioResult<Option<LandmarkFrame>> {
        Ok(self
            .frames
            .get(&frame.index)
            .filter(|f| f.has_detection(mode))
            .cloned())
    }
}

/// Header line sent to a detector process before each frame's RGB bytes.
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub mode: DetectionMode,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

/// Talks to an external detector over stdio.
///
/// Per frame the detector receives one JSON [`DetectRequest`] line followed
/// by `width * height * 3` RGB24 bytes, and answers with one JSON line:
/// a landmark frame object, or `null` for no detection.
pub struct ProcessLandmarkProvider {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    min_detection_confidence: f64,
    min_tracking_confidence: f64,
    line: String,
}

impl ProcessLandmarkProvider {
    /// Spawn `program args...`. stderr is inherited so detector logs stay visible.
    pub fn spawn(
        program: &str,
        args: &[String],
        min_detection_confidence: f64,
        min_tracking_confidence: f64,
    ) -> GonioResult<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| GonioError::landmark(format!("Failed to start detector {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GonioError::landmark("Failed to capture detector stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GonioError::landmark("Failed to capture detector stdout"))?;

        tracing::info!(pid = child.id(), program, "Started landmark detector");

        Ok(Self {
            program: program.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            min_detection_confidence,
            min_tracking_confidence,
            line: String::new(),
        })
    }
}

impl LandmarkProvider for ProcessLandmarkProvider {
    fn name(&self) -> &str {
        &self.program
    }

    fn detect(
        &mut self,
        frame: &VideoFrame,
        mode: DetectionMode,
    ) -> GonioResult<Option<LandmarkFrame>> {
        let size = frame.size();
        let request = DetectRequest {
            frame: frame.index,
            width: size.width,
            height: size.height,
            mode,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        };

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| GonioError::landmark("Detector input already closed"))?;
        let header = serde_json::to_string(&request)?;
        writeln!(stdin, "{header}")
            .and_then(|_| stdin.write_all(frame.as_rgb()))
            .and_then(|_| stdin.flush())
            .map_err(|e| GonioError::landmark(format!("Failed to send frame {}: {e}", frame.index)))?;

        self.line.clear();
        let read = self
            .stdout
            .read_line(&mut self.line)
            .map_err(|e| GonioError::landmark(format!("Failed to read detector output: {e}")))?;
        if read == 0 {
            return Err(GonioError::landmark(format!(
                "Detector exited before answering frame {}",
                frame.index
            )));
        }

        parse_detector_reply(&self.line, frame.index, mode)
    }
}

impl Drop for ProcessLandmarkProvider {
    fn drop(&mut self) {
        // Closing stdin lets a well-behaved detector exit on its own.
        self.stdin = None;
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Parse one detector reply line. The frame index is taken from the request.
pub fn parse_detector_reply(
    line: &str,
    frame_index: u64,
    mode: DetectionMode,
) -> GonioResult<Option<LandmarkFrame>> {
    let reply: Option<LandmarkFrame> = serde_json::from_str(line.trim()).map_err(|e| {
        GonioError::landmark(format!("Unreadable detector reply for frame {frame_index}: {e}"))
    })?;
    Ok(reply
        .map(|mut f| {
            f.frame = frame_index;
            f
        })
        .filter(|f| f.has_detection(mode)))
}
