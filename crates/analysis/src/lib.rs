//! Gonio Analysis: per-frame angle extraction and range tracking
//!
//! Turns one frame's landmarks into one angle sample and folds samples
//! into running ranges:
//! - **Geometry:** angle at a vertex from three 2D points
//! - **Strategies:** per-movement point selection (abduction, flexion,
//!   pronation/supination)
//! - **Classifier:** pronation / supination / neutral from a horizontal delta
//! - **Range tracking:** order-independent min/max accumulation
//!
//! Pure computation. No I/O and no platform dependencies.

pub mod classifier;
pub mod geometry;
pub mod measure;
pub mod range;
pub mod strategy;

pub use classifier::classify_dx;
pub use geometry::{angle, AngleFormula};
pub use measure::{measure_frame, AngleSample, FrameOutcome, OutcomeLabel};
pub use range::{RangeAccumulator, RangeSummary, RangeTracker};
pub use strategy::{arm_strategies, strategy_for, MovementStrategy, SelectedPoints, Selection};
