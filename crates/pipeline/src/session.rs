//! Measurement session: one run over one video.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gonio_analysis::{arm_strategies, measure_frame, FrameOutcome, RangeSummary, RangeTracker};
use gonio_common::clock::{FrameClock, RateController, RunClock};
use gonio_common::error::{GonioError, GonioResult};
use gonio_model::movement::{Category, Side};
use gonio_model::report::{AnalysisReport, FrameStats};
use gonio_video::{Annotator, SinkSpec, VideoBackend};

use crate::annotate::build_overlay;
use crate::config::{config_error, RunConfig};
use crate::consumer::ResultConsumer;
use crate::provider::LandmarkProvider;
use crate::trace::{TraceHeader, TraceRecord, TraceWriter, TRACE_SCHEMA_VERSION};

const PROGRESS_INTERVAL_MS: u64 = 2_000;

/// State of a measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing opened.
    Idle,
    /// Decoder and encoder open.
    Opened,
    /// Frames are being processed.
    Reading,
    /// Encoder flushing, report being assembled.
    Finalizing,
    /// All resources released, successfully or not.
    Closed,
}

/// Runs one movement measurement over one video.
///
/// The session exclusively owns its provider and, while running, its
/// decoder, encoder and accumulators. Decoder and encoder are released on
/// every exit path.
pub struct MeasurementSession {
    config: RunConfig,
    backend: Arc<dyn VideoBackend>,
    provider: Box<dyn LandmarkProvider>,
    state: SessionState,
    stop_flag: Arc<AtomicBool>,
}

impl MeasurementSession {
    pub fn new(
        config: RunConfig,
        backend: Arc<dyn VideoBackend>,
        provider: Box<dyn LandmarkProvider>,
    ) -> Self {
        Self {
            config,
            backend,
            provider,
            state: SessionState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Flag that ends the run early. Frames read so far are still finalized.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Process the whole video and return the report.
    pub fn run(&mut self) -> GonioResult<AnalysisReport> {
        if self.state != SessionState::Idle {
            return Err(GonioError::processing("Session already ran"));
        }

        let result = self.execute();
        self.state = SessionState::Closed;

        match &result {
            Ok(report) => tracing::info!(
                run = %report.id,
                frames = report.frames.total_frames,
                measured = report.frames.measured_frames,
                output = %report.output_video.display(),
                "Measurement run complete"
            ),
            Err(err) => tracing::error!(run = %self.config.id, error = %err, "Measurement run failed"),
        }
        result
    }

    /// Run, then hand the report to `consumer`.
    pub fn run_with(&mut self, consumer: &mut dyn ResultConsumer) -> GonioResult<AnalysisReport> {
        let report = self.run()?;
        consumer.consume(&report)?;
        Ok(report)
    }

    fn execute(&mut self) -> GonioResult<AnalysisReport> {
        let movement = self.config.movement.clone();
        movement.validate().map_err(config_error)?;
        let annotator = Annotator::new(&self.config.annotation)?;
        let strategies = arm_strategies(&movement);
        let mode = movement.kind.detection_mode();

        tracing::info!(
            run = %self.config.id,
            movement = %movement.kind,
            side = %movement.side,
            input = %self.config.input.display(),
            provider = self.provider.name(),
            backend = self.backend.name(),
            "Starting measurement run"
        );

        let mut source = self
            .backend
            .open_source(&self.config.input)
            .map_err(|e| resource_error("open input", &self.config.input, e))?;
        let info = source.info();
        let size = info.size();
        let clock = FrameClock::new(info.fps.unwrap_or(0.0), self.config.fallback_fps);

        let sink_spec = SinkSpec {
            path: self.config.output.clone(),
            size,
            fps: clock.fps(),
        };
        let mut sink = match self.backend.open_sink(&sink_spec) {
            Ok(sink) => sink,
            Err(err) => {
                drop(source);
                return Err(resource_error("create output", &self.config.output, err));
            }
        };

        let run_clock = RunClock::start();
        let mut trace = match &self.config.trace {
            Some(path) => {
                let header = TraceHeader {
                    schema_version: TRACE_SCHEMA_VERSION.to_string(),
                    run_id: self.config.id.clone(),
                    movement: movement.kind,
                    side: movement.side,
                    fps: clock.fps(),
                    width: size.width,
                    height: size.height,
                    started_at: run_clock.started_wall().to_string(),
                };
                Some(
                    TraceWriter::create(path, &header)
                        .map_err(|e| resource_error("create trace", path, e))?,
                )
            }
            None => None,
        };
        self.state = SessionState::Opened;
        tracing::debug!(
            width = size.width,
            height = size.height,
            fps = clock.fps(),
            frames = ?info.frame_count,
            "Video streams opened"
        );

        self.state = SessionState::Reading;
        let mut trackers = vec![RangeTracker::new(); strategies.len()];
        let mut stats = FrameStats::default();
        let mut progress = RateController::every_ms(PROGRESS_INTERVAL_MS);
        let bilateral = movement.side.is_bilateral();

        loop {
            // Checked before decoding so no decoded frame is left unwritten.
            if self.stop_flag.load(Ordering::SeqCst) {
                tracing::warn!(frames = stats.total_frames, "Stop requested, finalizing early");
                break;
            }
            let Some(mut frame) = source.next_frame()? else {
                break;
            };
            stats.total_frames += 1;

            let landmarks = self
                .provider
                .detect(&frame, mode)?
                .filter(|l| l.has_detection(mode));
            let outcomes: Vec<(Side, FrameOutcome)> = strategies
                .iter()
                .map(|strategy| {
                    (
                        strategy.side(),
                        measure_frame(strategy.as_ref(), landmarks.as_ref(), size),
                    )
                })
                .collect();

            if landmarks.is_some() {
                stats.detected_frames += 1;
            }
            count_frame(&mut stats, &outcomes, frame.index);
            for ((_, outcome), tracker) in outcomes.iter().zip(trackers.iter_mut()) {
                if let Some(sample) = outcome.sample() {
                    tracker.observe(sample.angle, sample.category);
                }
            }

            if let Some(landmarks) = &landmarks {
                let overlay = build_overlay(&movement, landmarks, &outcomes, size);
                annotator.annotate(&mut frame.image, &overlay);
            }
            sink.write_frame(&frame)?;

            if let Some(trace) = trace.as_mut() {
                for (arm, outcome) in &outcomes {
                    let sample = outcome.sample();
                    trace.write_record(&TraceRecord {
                        frame: frame.index,
                        timestamp_secs: clock.frame_to_secs(frame.index),
                        side: bilateral.then_some(*arm),
                        outcome: outcome.label(),
                        angle: sample.map(|s| s.angle),
                        category: sample.and_then(|s| s.category),
                    })?;
                }
            }

            if progress.should_tick(run_clock.elapsed_ns()) {
                tracing::info!(
                    frame = frame.index,
                    total = ?info.frame_count,
                    measured = stats.measured_frames,
                    throughput_fps = run_clock.throughput_fps(stats.total_frames),
                    "Processing"
                );
            }
        }

        self.state = SessionState::Finalizing;
        sink.finish()?;
        drop(sink);
        drop(source);
        if let Some(mut trace) = trace.take() {
            trace.flush()?;
        }

        let summaries: Vec<_> = trackers
            .iter()
            .map(|t| t.finalize(movement.reference_range))
            .collect();
        let arm_range = |arm: Side| {
            strategies
                .iter()
                .zip(&summaries)
                .find(|(strategy, _)| strategy.side() == arm)
                .and_then(|(_, summary)| summary.range)
        };
        let summary = if bilateral {
            RangeSummary::default()
        } else {
            summaries.first().copied().unwrap_or_default()
        };

        let mut empty = Vec::new();
        if bilateral {
            for &arm in movement.side.arms() {
                if arm_range(arm).is_none() {
                    empty.push(format!("{} {}", movement.kind, arm));
                }
            }
        } else if movement.kind.is_dual_state() {
            if summary.pronation.is_none() {
                empty.push(Category::Pronation.as_str().to_string());
            }
            if summary.supination.is_none() {
                empty.push(Category::Supination.as_str().to_string());
            }
        } else if summary.range.is_none() {
            empty.push(movement.kind.as_str().to_string());
        }
        for category in empty {
            tracing::warn!(
                run = %self.config.id,
                error = %GonioError::no_data(category),
                "Range left empty"
            );
        }

        Ok(AnalysisReport {
            id: self.config.id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            movement: movement.kind,
            side: movement.side,
            range: summary.range,
            pronation: summary.pronation,
            supination: summary.supination,
            left: if bilateral { arm_range(Side::Left) } else { None },
            right: if bilateral { arm_range(Side::Right) } else { None },
            output_video: self.config.output.clone(),
            source_video: self.config.input.clone(),
            fps: clock.fps(),
            width: size.width,
            height: size.height,
            duration_secs: clock.duration_secs(stats.total_frames),
            frames: stats,
            reference_range: movement.reference_range,
        })
    }
}

/// Fold one frame's per-arm outcomes into the frame counters.
///
/// A frame counts as measured when any arm was measured. Otherwise the
/// most specific failure across arms is counted once.
fn count_frame(stats: &mut FrameStats, outcomes: &[(Side, FrameOutcome)], index: u64) {
    let samples: Vec<_> = outcomes.iter().filter_map(|(_, o)| o.sample()).collect();
    if !samples.is_empty() {
        stats.measured_frames += 1;
        if samples
            .iter()
            .all(|s| s.category == Some(Category::Neutral))
        {
            stats.neutral_frames += 1;
        }
        return;
    }

    for (arm, outcome) in outcomes {
        if let FrameOutcome::Degenerate { reason } = outcome {
            tracing::warn!(frame = index, side = %arm, reason = %reason, "Degenerate geometry");
        }
    }
    if outcomes
        .iter()
        .any(|(_, o)| matches!(o, FrameOutcome::Degenerate { .. }))
    {
        stats.degenerate_frames += 1;
    } else if outcomes
        .iter()
        .any(|(_, o)| matches!(o, FrameOutcome::MissingLandmarks))
    {
        stats.missing_landmark_frames += 1;
    }
}

/// Classify an open/create failure as a resource error, keeping the path.
fn resource_error(action: &str, path: &Path, err: GonioError) -> GonioError {
    match err {
        GonioError::Resource { .. } => err,
        other => GonioError::resource(format!("Failed to {action} {}: {other}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_keeps_resource_variant() {
        let err = resource_error(
            "open input",
            Path::new("in.mp4"),
            GonioError::resource("no stream"),
        );
        assert_eq!(err.to_string(), "Resource error: no stream");

        let err = resource_error(
            "open input",
            Path::new("in.mp4"),
            GonioError::FileNotFound {
                path: "in.mp4".into(),
            },
        );
        assert!(matches!(err, GonioError::Resource { .. }));
        assert!(err.to_string().contains("open input in.mp4"));
    }
}
