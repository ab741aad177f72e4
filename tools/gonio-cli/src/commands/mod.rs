pub mod analyze;
pub mod batch;
pub mod check;
pub mod probe;
pub mod validate;

use std::path::PathBuf;

use clap::Args;
use gonio_model::movement::{MovementConfig, Side};
use gonio_model::report::{AnalysisReport, AngleRange};
use gonio_pipeline::{JsonlLandmarkProvider, LandmarkProvider, ProcessLandmarkProvider};
use serde::Deserialize;

/// Where per-frame landmarks come from.
#[derive(Args, Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderArgs {
    /// Precomputed landmarks, one JSON frame per line
    #[arg(long, conflicts_with = "detector")]
    pub landmarks: Option<PathBuf>,

    /// External detector program speaking the stdio frame protocol
    #[arg(long)]
    pub detector: Option<String>,

    /// Argument passed to the detector (repeatable)
    #[arg(long = "detector-arg", allow_hyphen_values = true)]
    pub detector_args: Vec<String>,
}

impl ProviderArgs {
    pub fn build(&self, movement: &MovementConfig) -> anyhow::Result<Box<dyn LandmarkProvider>> {
        match (&self.landmarks, &self.detector) {
            (Some(path), _) => {
                let provider = JsonlLandmarkProvider::from_path(path)
                    .map_err(|e| anyhow::anyhow!("Failed to load landmarks: {e}"))?;
                Ok(Box::new(provider))
            }
            (None, Some(program)) => {
                let provider = ProcessLandmarkProvider::spawn(
                    program,
                    &self.detector_args,
                    movement.min_detection_confidence,
                    movement.min_tracking_confidence,
                )?;
                Ok(Box::new(provider))
            }
            (None, None) => anyhow::bail!("Either --landmarks or --detector is required"),
        }
    }
}

pub fn print_report(report: &AnalysisReport) {
    println!("Run {}", report.id);
    println!("  Movement: {} ({})", report.movement, report.side);
    println!(
        "  Video: {}x{} @ {:.2} fps, {:.1}s",
        report.width, report.height, report.fps, report.duration_secs
    );
    println!(
        "  Frames: {} total, {} detected, {} measured, {} missing landmarks, {} degenerate",
        report.frames.total_frames,
        report.frames.detected_frames,
        report.frames.measured_frames,
        report.frames.missing_landmark_frames,
        report.frames.degenerate_frames,
    );

    if report.side.is_bilateral() {
        print_range("Left", report.arm_range(Side::Left));
        print_range("Right", report.arm_range(Side::Right));
    } else if report.movement.is_dual_state() {
        println!("  Neutral frames: {}", report.frames.neutral_frames);
        print_range("Pronation", report.pronation.as_ref());
        print_range("Supination", report.supination.as_ref());
    } else {
        print_range("Range", report.range.as_ref());
    }
    println!("  Output: {}", report.output_video.display());
}

fn print_range(label: &str, range: Option<&AngleRange>) {
    let Some(range) = range else {
        println!("  {label}: no data");
        return;
    };
    print!(
        "  {label}: {:.1}° to {:.1}° (delta {:.1}°, {} samples)",
        range.min_angle, range.max_angle, range.delta_angle, range.samples
    );
    match range.coverage_percent {
        Some(coverage) => println!(", {coverage:.0}% of reference"),
        None => println!(),
    }
}
