//! Measure one movement in one video.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Args;
use gonio_common::config::AppConfig;
use gonio_model::movement::ReferenceRange;
use gonio_pipeline::{
    AnalysisOverrides, JsonReportWriter, MeasurementLogWriter, MeasurementSession,
    ResultConsumer, RunConfig, RunRequest,
};
use gonio_video::{FfmpegBackend, VideoBackend};

use super::{print_report, ProviderArgs};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Movement: abduction, flexion, or pronation-supination
    pub movement: String,

    /// Side: left, right, or both (flexion only)
    pub side: String,

    /// Input video
    pub input: PathBuf,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Annotated output video (defaults to <output_dir>/<run-id>_output.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a per-frame sample trace (JSONL)
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Write the report into this directory instead of next to the video
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Append the measurement record to this JSONL file
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Horizontal pixel displacement below which a hand pose is neutral
    #[arg(long)]
    pub neutral_threshold: Option<f64>,

    /// Abduction virtual point offset below the shoulder (normalized)
    #[arg(long)]
    pub abduction_offset: Option<f64>,

    /// Pronation virtual point offset above the reference landmark (pixels)
    #[arg(long)]
    pub pronation_offset: Option<f64>,

    /// Take the detector's handedness labels as-is instead of mirroring them
    #[arg(long)]
    pub no_mirror: bool,

    /// Normal range minimum for coverage reporting (degrees)
    #[arg(long, requires = "reference_max")]
    pub reference_min: Option<f64>,

    /// Normal range maximum for coverage reporting (degrees)
    #[arg(long, requires = "reference_min")]
    pub reference_max: Option<f64>,
}

impl AnalyzeArgs {
    pub(crate) fn request(&self) -> RunRequest {
        let reference_range = match (self.reference_min, self.reference_max) {
            (Some(min), Some(max)) => Some(ReferenceRange { min, max }),
            _ => None,
        };
        RunRequest {
            movement: self.movement.clone(),
            side: self.side.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            trace: self.trace.clone(),
            overrides: AnalysisOverrides {
                neutral_threshold_px: self.neutral_threshold,
                abduction_virtual_offset: self.abduction_offset,
                pronation_virtual_offset_px: self.pronation_offset,
                mirror_handedness: self.no_mirror.then_some(false),
                reference_range,
            },
        }
    }
}

pub async fn run(app: AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = RunConfig::resolve(&app, args.request())
        .map_err(|e| anyhow::anyhow!("Invalid run: {e}"))?;

    let backend = FfmpegBackend::new(&app.video);
    if !backend.is_available() {
        anyhow::bail!(
            "{} is not available. Install ffmpeg or set video.ffmpeg in the config.",
            app.video.ffmpeg
        );
    }
    let provider = args.provider.build(&config.movement)?;

    println!("Analyzing {}", config.input.display());
    println!("  Movement: {} ({})", config.movement.kind, config.movement.side);
    println!("  Landmarks: {}", provider.name());
    println!("  Output: {}", config.output.display());
    println!();

    let mut session = MeasurementSession::new(config, Arc::new(backend), provider);

    // Ctrl+C finalizes what has been read so far.
    let stop = session.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let report = tokio::task::spawn_blocking(move || session.run()).await??;

    let mut writer = match &args.report_dir {
        Some(dir) => JsonReportWriter::into_dir(dir),
        None => JsonReportWriter::new(),
    };
    writer.consume(&report)?;
    if let Some(path) = &args.log {
        MeasurementLogWriter::new(path).consume(&report)?;
    }

    print_report(&report);
    if let Some(path) = writer.written().first() {
        println!("  Report: {}", path.display());
    }
    Ok(())
}
