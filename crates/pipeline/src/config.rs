//! Run configuration: application defaults plus per-run input.

use std::path::PathBuf;

use gonio_common::config::{AnnotationConfig, AppConfig};
use gonio_common::error::{GonioError, GonioResult};
use gonio_model::error::ModelError;
use gonio_model::landmark::HandLandmark;
use gonio_model::movement::{MovementConfig, ReferenceRange};
use gonio_model::report::generate_run_id;

/// Per-run overrides of the configured analysis constants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOverrides {
    pub neutral_threshold_px: Option<f64>,
    pub abduction_virtual_offset: Option<f64>,
    pub pronation_virtual_offset_px: Option<f64>,
    pub mirror_handedness: Option<bool>,
    pub reference_range: Option<ReferenceRange>,
}

/// What a caller asks for, as plain strings and paths.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub movement: String,
    pub side: String,
    pub input: PathBuf,
    /// Explicit output path. Defaults to `<output_dir>/<run-id>_output.mp4`.
    pub output: Option<PathBuf>,
    /// Optional per-frame sample trace (JSONL).
    pub trace: Option<PathBuf>,
    pub overrides: AnalysisOverrides,
}

impl RunRequest {
    pub fn new(movement: impl Into<String>, side: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        Self {
            movement: movement.into(),
            side: side.into(),
            input: input.into(),
            output: None,
            trace: None,
            overrides: AnalysisOverrides::default(),
        }
    }
}

/// Immutable, validated configuration owned by one session.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Run identifier, used in the default output name and the report.
    pub id: String,
    pub movement: MovementConfig,
    pub input: PathBuf,
    pub output: PathBuf,
    pub trace: Option<PathBuf>,
    /// Frame rate assumed when the source reports none.
    pub fallback_fps: f64,
    pub annotation: AnnotationConfig,
}

impl RunConfig {
    /// Parse and validate a request against the application config.
    ///
    /// Fails with a configuration error before any resource is touched.
    pub fn resolve(app: &AppConfig, request: RunRequest) -> GonioResult<Self> {
        let mut movement =
            MovementConfig::parse(&request.movement, &request.side).map_err(config_error)?;

        let analysis = &app.analysis;
        movement.min_detection_confidence = analysis.min_detection_confidence;
        movement.min_tracking_confidence = analysis.min_tracking_confidence;
        movement.abduction_virtual_offset = analysis.abduction_virtual_offset;
        movement.pronation_virtual_offset_px = analysis.pronation_virtual_offset_px;
        movement.neutral_threshold_px = analysis.neutral_threshold_px;
        movement.mirror_handedness = analysis.mirror_handedness;
        movement.reference_landmark = analysis
            .reference_landmark
            .parse::<HandLandmark>()
            .map_err(config_error)?;
        movement.tip_landmark = analysis
            .tip_landmark
            .parse::<HandLandmark>()
            .map_err(config_error)?;

        let overrides = request.overrides;
        if let Some(v) = overrides.neutral_threshold_px {
            movement.neutral_threshold_px = v;
        }
        if let Some(v) = overrides.abduction_virtual_offset {
            movement.abduction_virtual_offset = v;
        }
        if let Some(v) = overrides.pronation_virtual_offset_px {
            movement.pronation_virtual_offset_px = v;
        }
        if let Some(v) = overrides.mirror_handedness {
            movement.mirror_handedness = v;
        }
        movement.reference_range = overrides.reference_range;

        movement.validate().map_err(config_error)?;

        if !(app.video.fallback_fps.is_finite() && app.video.fallback_fps > 0.0) {
            return Err(GonioError::config(format!(
                "fallback fps must be positive, got {}",
                app.video.fallback_fps
            )));
        }

        let id = generate_run_id();
        let output = request
            .output
            .unwrap_or_else(|| default_output_path(&app.output_dir, &id));
        let is_mp4 = output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if !is_mp4 {
            return Err(GonioError::unsupported(format!(
                "output must be an .mp4 file, got {}",
                output.display()
            )));
        }

        Ok(Self {
            id,
            movement,
            input: request.input,
            output,
            trace: request.trace,
            fallback_fps: app.video.fallback_fps,
            annotation: app.annotation.clone(),
        })
    }
}

/// `<output_dir>/<run-id>_output.mp4`
pub fn default_output_path(output_dir: &std::path::Path, run_id: &str) -> PathBuf {
    output_dir.join(format!("{run_id}_output.mp4"))
}

pub(crate) fn config_error(err: ModelError) -> GonioError {
    GonioError::config(err.to_string())
}
