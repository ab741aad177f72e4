//! Running min/max tracking.
//!
//! An accumulator starts empty and only yields a range once it has seen at
//! least one sample, so "nothing observed" is never confused with a real
//! 0° or 180° reading.

use gonio_model::movement::{Category, ReferenceRange};
use gonio_model::report::AngleRange;

/// Running min/max of observed angles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeAccumulator {
    min: f64,
    max: f64,
    count: u64,
}

impl RangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a value into the range. Non-finite values are ignored.
    pub fn observe(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Observed range, `None` when no sample was folded in.
    pub fn finalize(&self) -> Option<AngleRange> {
        (self.count > 0).then(|| AngleRange::new(self.min, self.max, self.count))
    }
}

/// Final ranges for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeSummary {
    pub range: Option<AngleRange>,
    pub pronation: Option<AngleRange>,
    pub supination: Option<AngleRange>,
}

/// Routes samples to the overall or per-category accumulators.
#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    overall: RangeAccumulator,
    pronation: RangeAccumulator,
    supination: RangeAccumulator,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one measured angle.
    ///
    /// Uncategorized samples feed the overall range. Categorized samples
    /// feed only their category; neutral samples feed nothing.
    pub fn observe(&mut self, value: f64, category: Option<Category>) {
        match category {
            None => self.overall.observe(value),
            Some(Category::Pronation) => self.pronation.observe(value),
            Some(Category::Supination) => self.supination.observe(value),
            Some(Category::Neutral) => {}
        }
    }

    pub fn accumulator(&self, category: Option<Category>) -> Option<&RangeAccumulator> {
        match category {
            None => Some(&self.overall),
            Some(Category::Pronation) => Some(&self.pronation),
            Some(Category::Supination) => Some(&self.supination),
            Some(Category::Neutral) => None,
        }
    }

    pub fn finalize(&self, reference: Option<ReferenceRange>) -> RangeSummary {
        let with_ref = |acc: &RangeAccumulator| acc.finalize().map(|r| r.with_reference(reference));
        RangeSummary {
            range: with_ref(&self.overall),
            pronation: with_ref(&self.pronation),
            supination: with_ref(&self.supination),
        }
    }
}
