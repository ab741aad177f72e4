//! Analysis report types.
//!
//! An [`AnalysisReport`] is produced once per run and handed to whatever
//! persists measurements. Ranges with no observed samples serialize as
//! `null`, never as sentinel angles.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::movement::{Category, MovementKind, ReferenceRange, Side};

/// Observed angle range for one accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    /// Smallest observed angle (degrees).
    pub min_angle: f64,
    /// Largest observed angle (degrees).
    pub max_angle: f64,
    /// `max_angle - min_angle`.
    pub delta_angle: f64,
    /// Number of samples that contributed.
    pub samples: u64,
    /// Achieved span as a percentage of the reference span, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
}

impl AngleRange {
    pub fn new(min_angle: f64, max_angle: f64, samples: u64) -> Self {
        Self {
            min_angle,
            max_angle,
            delta_angle: max_angle - min_angle,
            samples,
            coverage_percent: None,
        }
    }

    /// Attach coverage relative to a normal range.
    pub fn with_reference(mut self, reference: Option<ReferenceRange>) -> Self {
        self.coverage_percent = reference
            .filter(|r| r.span() > 0.0)
            .map(|r| (self.delta_angle / r.span() * 100.0).max(0.0));
        self
    }
}

/// Per-run frame accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameStats {
    /// Frames read from the source.
    pub total_frames: u64,
    /// Frames where the provider reported a usable detection.
    pub detected_frames: u64,
    /// Frames that produced an angle.
    pub measured_frames: u64,
    /// Detected frames missing a required landmark (or matching hand).
    pub missing_landmark_frames: u64,
    /// Frames skipped because the measurement points coincided.
    pub degenerate_frames: u64,
    /// Measured frames classified neutral (not accumulated).
    pub neutral_frames: u64,
}

/// Final output of a measurement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Run identifier, also used in the output file name.
    pub id: String,

    /// Completion timestamp (RFC 3339).
    pub created_at: String,

    pub movement: MovementKind,
    pub side: Side,

    /// Overall range for single-state movements (abduction, flexion).
    pub range: Option<AngleRange>,

    /// Pronation range (pronation/supination only).
    pub pronation: Option<AngleRange>,

    /// Supination range (pronation/supination only).
    pub supination: Option<AngleRange>,

    /// Left arm range for bilateral runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<AngleRange>,

    /// Right arm range for bilateral runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<AngleRange>,

    /// Annotated output video.
    pub output_video: PathBuf,

    /// Source video.
    pub source_video: PathBuf,

    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,

    pub frames: FrameStats,

    #[serde(default)]
    pub reference_range: Option<ReferenceRange>,
}

/// Flattened shape persisted by the measurement store.
///
/// The primary angles are `null` for a pronation/supination run that only
/// observed supination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub movement: MovementKind,
    pub side: Side,
    pub angle_min: Option<f64>,
    pub angle_max: Option<f64>,
    /// Calendar date of the measurement (`YYYY-MM-DD`).
    pub date: String,
    /// Supination range for pronation/supination runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<AngleRange>,
    pub output_video: PathBuf,
}

impl AnalysisReport {
    /// Range recorded for a category.
    pub fn category_range(&self, category: Category) -> Option<&AngleRange> {
        match category {
            Category::Pronation => self.pronation.as_ref(),
            Category::Supination => self.supination.as_ref(),
            Category::Neutral => None,
        }
    }

    /// Range recorded for one arm of a run.
    pub fn arm_range(&self, arm: Side) -> Option<&AngleRange> {
        match (self.side.is_bilateral(), arm) {
            (true, Side::Left) => self.left.as_ref(),
            (true, Side::Right) => self.right.as_ref(),
            (true, Side::Both) => None,
            (false, arm) if arm == self.side => self.range.as_ref(),
            (false, _) => None,
        }
    }

    /// Whether any range has data.
    pub fn has_data(&self) -> bool {
        self.range.is_some()
            || self.pronation.is_some()
            || self.supination.is_some()
            || self.left.is_some()
            || self.right.is_some()
    }

    /// Flatten into the persisted measurement shape: one record per measured
    /// arm.
    ///
    /// Fails with [`ModelError::NoData`] only when nothing was measured. A
    /// pronation/supination run with a single observed category still
    /// yields a record.
    pub fn measurement_records(&self) -> Result<Vec<MeasurementRecord>, ModelError> {
        let date = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|_| chrono::Utc::now().date_naive())
            .format("%Y-%m-%d")
            .to_string();
        let record = |side: Side, primary: Option<&AngleRange>, secondary: Option<AngleRange>| {
            MeasurementRecord {
                movement: self.movement,
                side,
                angle_min: primary.map(|r| r.min_angle),
                angle_max: primary.map(|r| r.max_angle),
                date: date.clone(),
                secondary,
                output_video: self.output_video.clone(),
            }
        };

        let records: Vec<MeasurementRecord> = if self.side.is_bilateral() {
            Side::Both
                .arms()
                .iter()
                .filter_map(|&arm| self.arm_range(arm).map(|r| record(arm, Some(r), None)))
                .collect()
        } else if self.movement.is_dual_state() {
            if self.pronation.is_some() || self.supination.is_some() {
                vec![record(self.side, self.pronation.as_ref(), self.supination)]
            } else {
                Vec::new()
            }
        } else {
            self.range
                .as_ref()
                .map(|r| record(self.side, Some(r), None))
                .into_iter()
                .collect()
        };

        if records.is_empty() {
            return Err(ModelError::NoData {
                category: self.movement.as_str().to_string(),
            });
        }
        Ok(records)
    }

    /// Write the report as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Read a report written by [`AnalysisReport::save_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| ModelError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Generate a run identifier (UUID v4 layout) without an external dependency.
pub fn generate_run_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed) as u128;
    let seed = nanos ^ (count << 96) ^ ((std::process::id() as u128) << 64);
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        (seed >> 76) & 0xFFFF_FFFF_FFFF,
    )
}
