//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where annotated videos and reports are written.
    pub output_dir: PathBuf,

    /// Measurement constants applied to every run unless overridden.
    pub analysis: AnalysisDefaults,

    /// Decoder/encoder settings.
    pub video: VideoDefaults,

    /// Overlay drawing settings.
    pub annotation: AnnotationConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default measurement constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Minimum confidence the landmark provider needs to report a detection.
    pub min_detection_confidence: f64,

    /// Minimum confidence for frame-to-frame tracking (hand mode).
    pub min_tracking_confidence: f64,

    /// Abduction: how far below the shoulder the virtual point sits,
    /// as a fraction of normalized frame height.
    pub abduction_virtual_offset: f64,

    /// Pronation/supination: how far above the reference knuckle the
    /// virtual point sits, in pixels.
    pub pronation_virtual_offset_px: f64,

    /// Horizontal displacement (pixels) below which a hand pose is neutral.
    pub neutral_threshold_px: f64,

    /// Hand landmark used as the angle vertex and classification reference.
    pub reference_landmark: String,

    /// Hand landmark used as the moving point.
    pub tip_landmark: String,

    /// Invert the provider's handedness label before matching the side.
    pub mirror_handedness: bool,
}

/// Video decoder/encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDefaults {
    /// ffmpeg binary used for decoding and encoding.
    pub ffmpeg: String,

    /// ffprobe binary used for stream inspection.
    pub ffprobe: String,

    /// Output video codec (ffmpeg encoder name).
    pub codec: String,

    /// Constant rate factor for the output encoder.
    pub crf: u32,

    /// Frame rate used when the source does not report one.
    pub fallback_fps: f64,
}

/// Overlay drawing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// TTF/OTF font used for angle labels. Without it a common system
    /// font is looked up; if none is found only shapes are drawn.
    pub font_path: Option<PathBuf>,

    /// Label text height in pixels.
    pub font_scale: f32,

    /// Measurement point radius in pixels.
    pub point_radius: i32,

    /// Segment thickness in pixels.
    pub line_thickness: i32,

    /// Draw the full detected skeleton, not just the measured joints.
    pub draw_skeleton: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gonio=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            analysis: AnalysisDefaults::default(),
            video: VideoDefaults::default(),
            annotation: AnnotationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            abduction_virtual_offset: 0.1,
            pronation_virtual_offset_px: 40.0,
            neutral_threshold_px: 10.0,
            reference_landmark: "ring_finger_tip".to_string(),
            tip_landmark: "index_finger_tip".to_string(),
            mirror_handedness: true,
        }
    }
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            codec: "libx264".to_string(),
            crf: 23,
            fallback_fps: 30.0,
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_scale: 32.0,
            point_radius: 8,
            line_thickness: 3,
            draw_skeleton: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location. `GONIO_CONFIG` wins over XDG lookup.
pub fn config_file_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("GONIO_CONFIG") {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gonio").join("config.json")
}

/// Default output directory for annotated videos.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("gonio").join("videos")
}
