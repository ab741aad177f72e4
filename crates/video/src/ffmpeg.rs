//! ffmpeg/ffprobe subprocess backend.
//!
//! Decoding pipes `rawvideo` RGB24 frames out of ffmpeg's stdout; encoding
//! pipes RGB24 frames into ffmpeg's stdin. Both children are killed and
//! reaped on drop, so an aborted run never leaves a process behind.

use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use gonio_common::config::VideoDefaults;
use gonio_common::error::{GonioError, GonioResult};
use gonio_model::point::FrameSize;
use serde::Deserialize;

use crate::stream::{FrameSink, FrameSource, SinkSpec, VideoBackend, VideoFrame, VideoInfo};

/// Video backend that shells out to ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
    codec: String,
    crf: u32,
}

impl FfmpegBackend {
    pub fn new(config: &VideoDefaults) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            codec: config.codec.clone(),
            crf: config.crf,
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(&VideoDefaults::default())
    }
}

impl VideoBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    fn probe(&self, path: &Path) -> GonioResult<VideoInfo> {
        if !path.exists() {
            return Err(GonioError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames\
                 :stream_tags=rotate:stream_side_data=rotation:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| GonioError::resource(format!("Failed to start {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            return Err(GonioError::resource(format!(
                "ffprobe could not read {} (status {}): {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&raw)
    }

    fn open_source(&self, path: &Path) -> GonioResult<Box<dyn FrameSource>> {
        let info = self.probe(path)?;
        let args = decode_args(path);
        tracing::debug!(args = ?args, "Spawning ffmpeg decoder");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GonioError::resource(format!("Failed to start ffmpeg decoder: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GonioError::resource("Failed to capture ffmpeg decoder stdout"))?;
        let stderr = drain_stderr(&mut child);

        tracing::info!(
            pid = child.id(),
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = ?info.fps,
            "Opened video source"
        );

        Ok(Box::new(FfmpegSource {
            info,
            child,
            stdout: Some(BufReader::new(stdout)),
            stderr,
            next_index: 0,
        }))
    }

    fn open_sink(&self, spec: &SinkSpec) -> GonioResult<Box<dyn FrameSink>> {
        if spec.size.is_empty() {
            return Err(GonioError::resource(format!(
                "Cannot encode {}x{} frames",
                spec.size.width, spec.size.height
            )));
        }
        if let Some(parent) = spec.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GonioError::resource(format!(
                    "Failed to create output directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let args = encode_args(spec, &self.codec, self.crf);
        tracing::debug!(args = ?args, "Spawning ffmpeg encoder");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GonioError::resource(format!("Failed to start ffmpeg encoder: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GonioError::resource("Failed to capture ffmpeg encoder stdin"))?;
        let stderr = drain_stderr(&mut child);

        tracing::info!(
            pid = child.id(),
            path = %spec.path.display(),
            codec = %self.codec,
            "Opened video sink"
        );

        Ok(Box::new(FfmpegSink {
            size: spec.size,
            child,
            stdin: Some(stdin),
            stderr,
            frames_written: 0,
            finished: false,
        }))
    }
}

struct FfmpegSource {
    info: VideoInfo,
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    next_index: u64,
}

impl FfmpegSource {
    /// Reap the decoder once its stdout is exhausted.
    fn close(&mut self) -> GonioResult<()> {
        self.stdout = None;
        let status = self
            .child
            .wait()
            .map_err(|e| GonioError::video(format!("Failed to wait on ffmpeg decoder: {e}")))?;
        let stderr_output = join_stderr(self.stderr.take());
        if !status.success() {
            return Err(GonioError::video(format!(
                "ffmpeg decoder failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> GonioResult<Option<VideoFrame>> {
        let Some(reader) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let size = self.info.size();
        let mut buf = vec![0u8; size.rgb_len()];
        let read = read_full(reader, &mut buf)
            .map_err(|e| GonioError::video(format!("Failed reading decoded frame: {e}")))?;

        if read < buf.len() {
            if read > 0 {
                tracing::warn!(
                    frame = self.next_index,
                    bytes = read,
                    expected = buf.len(),
                    "Discarding truncated trailing frame"
                );
            }
            self.close()?;
            return Ok(None);
        }

        let frame = VideoFrame::from_rgb(self.next_index, size, buf)?;
        self.next_index += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if self.stdout.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
            tracing::debug!(frames = self.next_index, "Closed video source early");
        }
    }
}

struct FfmpegSink {
    size: FrameSize,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    frames_written: u64,
    finished: bool,
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &VideoFrame) -> GonioResult<()> {
        if frame.size() != self.size {
            return Err(GonioError::video(format!(
                "frame {} is {}x{}, sink expects {}x{}",
                frame.index,
                frame.image.width(),
                frame.image.height(),
                self.size.width,
                self.size.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| GonioError::video("Video sink already finished"))?;
        stdin
            .write_all(frame.as_rgb())
            .map_err(|e| GonioError::video(format!("Failed writing frame to ffmpeg: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> GonioResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // Closing stdin signals end of stream to the encoder.
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| GonioError::video(format!("Failed flushing ffmpeg input: {e}")))?;
        }

        let status = self
            .child
            .wait()
            .map_err(|e| GonioError::video(format!("Failed to wait on ffmpeg encoder: {e}")))?;
        let stderr_output = join_stderr(self.stderr.take());
        if !status.success() {
            return Err(GonioError::video(format!(
                "ffmpeg encoder failed (status {status}): {}",
                stderr_output.trim()
            )));
        }

        tracing::info!(frames = self.frames_written, "Video sink finished");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if !self.finished {
            self.stdin = None;
            let _ = self.child.kill();
            let _ = self.child.wait();
            tracing::warn!(
                frames = self.frames_written,
                "Video sink dropped before finish; output abandoned"
            );
        }
    }
}

/// Arguments that decode `path` into packed RGB24 on stdout.
pub fn decode_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-i".to_string(),
        path.display().to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-".to_string(),
    ]
}

/// Arguments that encode packed RGB24 from stdin into `spec.path`.
pub fn encode_args(spec: &SinkSpec, codec: &str, crf: u32) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{}x{}", spec.size.width, spec.size.height),
        "-r".to_string(),
        format_rate(spec.fps),
        "-i".to_string(),
        "-".to_string(),
        "-an".to_string(),
        // yuv420p needs even dimensions.
        "-vf".to_string(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
        "-c:v".to_string(),
        codec.to_string(),
        "-crf".to_string(),
        crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        spec.path.display().to_string(),
    ]
}

fn format_rate(fps: f64) -> String {
    let rounded = (fps * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as u64)
    } else {
        format!("{rounded}")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse().ok())
            })
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into stream properties.
pub fn parse_probe_output(raw: &str) -> GonioResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(raw)
        .map_err(|e| GonioError::resource(format!("Unreadable ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| GonioError::resource("Input has no video stream"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(GonioError::resource("Video stream reports no dimensions")),
    };
    // The decoder applies the display rotation, so frames arrive transposed.
    let rotation = stream.rotation();
    let (width, height) = if rotation % 180 == 90 {
        tracing::debug!(rotation, "Rotated stream; swapping decoded dimensions");
        (height, width)
    } else {
        (width, height)
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
        duration_secs: probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse().ok()),
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. Zero rates are `None`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.trim().split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Check whether a binary is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Drain stderr on a thread so ffmpeg never blocks on a full pipe.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || -> String {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    }))
}

fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| {
            h.join()
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
        })
        .unwrap_or_default()
}

/// Read until `buf` is full or EOF. Returns the number of bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let raw = r#"{
            "programs": [],
            "streams": [{"width": 1280, "height": 720, "r_frame_rate": "30/1",
                         "avg_frame_rate": "30/1", "nb_frames": "90"}],
            "format": {"duration": "3.000000"}
        }"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert_eq!(info.fps, Some(30.0));
        assert_eq!(info.frame_count, Some(90));
        assert_eq!(info.duration_secs, Some(3.0));
    }

    #[test]
    fn test_rotated_stream_reports_decoded_dimensions() {
        let raw = r#"{"streams": [{"width": 1920, "height": 1080, "avg_frame_rate": "30/1",
                       "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(info.size().rgb_len(), 1080 * 1920 * 3);
    }

    #[test]
    fn test_legacy_rotate_tag_swaps_dimensions() {
        let raw = r#"{"streams": [{"width": 1280, "height": 720,
                       "tags": {"rotate": "270"}}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (720, 1280));

        let upside_down = r#"{"streams": [{"width": 1280, "height": 720,
                       "side_data_list": [{"rotation": 180}]}]}"#;
        let info = parse_probe_output(upside_down).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
    }

    #[test]
    fn test_parse_probe_falls_back_to_r_frame_rate() {
        let raw = r#"{"streams": [{"width": 640, "height": 480,
                       "avg_frame_rate": "0/0", "r_frame_rate": "24/1"}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.fps, Some(24.0));
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn test_parse_probe_rejects_missing_stream() {
        let err = parse_probe_output(r#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, GonioError::Resource { .. }));
    }

    #[test]
    fn test_encode_args_carry_geometry_and_codec() {
        let spec = SinkSpec {
            path: PathBuf::from("videos/run_output.mp4"),
            size: FrameSize::new(640, 480),
            fps: 29.97,
        };
        let args = encode_args(&spec, "libx264", 23);
        let joined = args.join(" ");
        assert!(joined.contains("-s 640x480"));
        assert!(joined.contains("-r 29.97"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-crf 23"));
        assert_eq!(args.last().map(String::as_str), Some("videos/run_output.mp4"));
    }

    #[test]
    fn test_decode_args_write_rgb_to_stdout() {
        let args = decode_args(Path::new("in.mp4"));
        assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "rgb24"));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(30.0), "30");
        assert_eq!(format_rate(29.97002997), "29.97");
    }

    #[test]
    fn test_read_full_stops_at_eof() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = &data[..];
        let mut buf = [0u8; 3];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        let mut buf = [0u8; 3];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_probe_missing_file() {
        let backend = FfmpegBackend::default();
        let err = backend
            .probe(Path::new("/nonexistent/gonio/input.mp4"))
            .unwrap_err();
        assert!(matches!(err, GonioError::FileNotFound { .. }));
    }

    #[test]
    fn test_open_sink_rejects_empty_frames() {
        let backend = FfmpegBackend::default();
        let spec = SinkSpec {
            path: std::env::temp_dir().join("gonio_empty_sink.mp4"),
            size: FrameSize::new(0, 480),
            fps: 30.0,
        };
        assert!(backend.open_sink(&spec).is_err());
    }
}
