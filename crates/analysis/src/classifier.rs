//! Lateral classification for pronation/supination.

use gonio_model::movement::{Category, Side};

/// Classify a hand pose from `dx = fingertip.x - reference.x` (pixels).
///
/// `|dx| < threshold` is neutral. Otherwise, on the right side a positive
/// `dx` is pronation; the left side mirrors the sign test. `Both` carries
/// no lateral sign and classifies everything as neutral.
pub fn classify_dx(dx: f64, side: Side, threshold_px: f64) -> Category {
    if dx.abs() < threshold_px {
        return Category::Neutral;
    }
    let pronation = match side {
        Side::Right => dx > 0.0,
        Side::Left => dx < 0.0,
        Side::Both => return Category::Neutral,
    };
    if pronation {
        Category::Pronation
    } else {
        Category::Supination
    }
}
