//! Angle between three points, measured at the middle one.
//!
//! Two formulas are available. Both return degrees in `[0, 180]`:
//!
//! - [`AngleFormula::DotProduct`]: `acos(u·v / |u||v|)` with the cosine
//!   clamped to `[-1, 1]`. Symmetric in `a` and `c`.
//! - [`AngleFormula::Atan2Folded`]: `|atan2(c - b) - atan2(a - b)|`, folded
//!   into `[0, 180]` via `360 - x`.
//!
//! A zero-length segment (`a == b` or `c == b`) or a non-finite coordinate
//! yields [`GonioError::DegenerateGeometry`].

use gonio_common::error::{GonioError, GonioResult};
use gonio_model::point::Point2D;
use serde::{Deserialize, Serialize};

/// Segments shorter than this (in their coordinate space) are zero-length.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Angle formula used by a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleFormula {
    DotProduct,
    Atan2Folded,
}

/// Angle at vertex `b` in degrees using the given formula.
pub fn angle(formula: AngleFormula, a: Point2D, b: Point2D, c: Point2D) -> GonioResult<f64> {
    match formula {
        AngleFormula::DotProduct => angle_dot(a, b, c),
        AngleFormula::Atan2Folded => angle_atan2(a, b, c),
    }
}

/// Dot-product form.
pub fn angle_dot(a: Point2D, b: Point2D, c: Point2D) -> GonioResult<f64> {
    let ((ux, uy), (vx, vy)) = segments(a, b, c)?;

    let dot = ux * vx + uy * vy;
    let norms = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    let cosine = (dot / norms).clamp(-1.0, 1.0);
    Ok(cosine.acos().to_degrees())
}

/// Atan2-difference form, folded into `[0, 180]`.
pub fn angle_atan2(a: Point2D, b: Point2D, c: Point2D) -> GonioResult<f64> {
    let ((ux, uy), (vx, vy)) = segments(a, b, c)?;

    let radians = vy.atan2(vx) - uy.atan2(ux);
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    Ok(degrees.clamp(0.0, 180.0))
}

/// The two arms `a - b` and `c - b`, rejecting degenerate input.
fn segments(a: Point2D, b: Point2D, c: Point2D) -> GonioResult<((f64, f64), (f64, f64))> {
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return Err(GonioError::degenerate(format!(
            "non-finite coordinate in ({a:?}, {b:?}, {c:?})"
        )));
    }

    let u = a.sub(&b);
    let v = c.sub(&b);
    if a.distance_to(&b) < DEGENERATE_EPSILON {
        return Err(GonioError::degenerate(format!(
            "first point coincides with vertex at ({:.4}, {:.4})",
            b.x, b.y
        )));
    }
    if c.distance_to(&b) < DEGENERATE_EPSILON {
        return Err(GonioError::degenerate(format!(
            "third point coincides with vertex at ({:.4}, {:.4})",
            b.x, b.y
        )));
    }
    Ok((u, v))
}
