//! Per-frame measurement.

use gonio_model::landmark::LandmarkFrame;
use gonio_model::movement::Category;
use gonio_model::point::FrameSize;
use serde::Serialize;

use crate::geometry::angle;
use crate::strategy::{MovementStrategy, SelectedPoints, Selection};

/// One measured angle with its geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSample {
    /// Degrees in `[0, 180]`.
    pub angle: f64,
    /// Lateral category for dual-state movements.
    pub category: Option<Category>,
    pub points: SelectedPoints,
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The provider found nothing for this movement's detection mode.
    NoDetection,
    /// Detected, but a required landmark or matching hand is missing.
    MissingLandmarks,
    /// The measured points coincide; the frame is skipped.
    Degenerate { reason: String },
    Measured(AngleSample),
}

impl FrameOutcome {
    pub fn sample(&self) -> Option<&AngleSample> {
        match self {
            Self::Measured(sample) => Some(sample),
            _ => None,
        }
    }

    /// Short label used in traces and logs.
    pub fn label(&self) -> OutcomeLabel {
        match self {
            Self::NoDetection => OutcomeLabel::NoDetection,
            Self::MissingLandmarks => OutcomeLabel::MissingLandmarks,
            Self::Degenerate { .. } => OutcomeLabel::Degenerate,
            Self::Measured(_) => OutcomeLabel::Measured,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLabel {
    NoDetection,
    MissingLandmarks,
    Degenerate,
    Measured,
}

/// Measure one frame. A missing landmark frame counts as no detection.
///
/// Degenerate geometry is frame-local: it is reported as an outcome, never
/// propagated as an error.
pub fn measure_frame(
    strategy: &dyn MovementStrategy,
    frame: Option<&LandmarkFrame>,
    size: FrameSize,
) -> FrameOutcome {
    let Some(frame) = frame else {
        return FrameOutcome::NoDetection;
    };

    let points = match strategy.select_points(frame, size) {
        Selection::Points(points) => points,
        Selection::NoDetection => return FrameOutcome::NoDetection,
        Selection::MissingLandmarks => return FrameOutcome::MissingLandmarks,
    };

    match angle(strategy.formula(), points.reference, points.vertex, points.moving) {
        Ok(value) => FrameOutcome::Measured(AngleSample {
            angle: value,
            category: strategy.classify(&points),
            points,
        }),
        Err(err) => {
            tracing::debug!(frame = frame.frame, error = %err, "Skipping degenerate frame");
            FrameOutcome::Degenerate {
                reason: err.to_string(),
            }
        }
    }
}
