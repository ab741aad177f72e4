//! Clock and timing utilities for video runs.
//!
//! Two clocks matter during a measurement run:
//! - the *media* clock, derived from frame index and stream frame rate
//! - the *wall* clock, used for report timestamps and throughput

use std::time::Instant;

/// Media-time clock for a stream with a fixed frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    /// Create a clock for the given frame rate. Non-positive or non-finite
    /// rates fall back to `fallback_fps`.
    pub fn new(fps: f64, fallback_fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            fallback_fps.max(1.0)
        };
        Self { fps }
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Presentation time of a frame in seconds.
    pub fn frame_to_secs(&self, frame_index: u64) -> f64 {
        frame_index as f64 / self.fps
    }

    /// Duration covered by `frame_count` frames.
    pub fn duration_secs(&self, frame_count: u64) -> f64 {
        self.frame_to_secs(frame_count)
    }
}

/// Wall clock anchored to the moment a run started.
#[derive(Debug, Clone)]
pub struct RunClock {
    started: Instant,
    started_wall: String,
}

impl RunClock {
    /// Create a run clock anchored to now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at run start (RFC 3339).
    pub fn started_wall(&self) -> &str {
        &self.started_wall
    }

    /// Nanoseconds elapsed since run start.
    pub fn elapsed_ns(&self) -> u64 {
        self.started.elapsed().as_nanos() as u64
    }

    /// Seconds elapsed since run start.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Processing throughput in frames per second of wall time.
    pub fn throughput_fps(&self, frames: u64) -> f64 {
        let secs = self.elapsed_secs();
        if secs <= 0.0 {
            return 0.0;
        }
        frames as f64 / secs
    }
}

/// Rate limiter for periodic progress reporting.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller that fires at most once per `interval_ms`.
    pub fn every_ms(interval_ms: u64) -> Self {
        Self {
            target_interval_ns: interval_ms.max(1) * 1_000_000,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
