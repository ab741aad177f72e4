//! Point and frame geometry types.

use serde::{Deserialize, Serialize};

/// Which coordinate space a point lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// `[0.0, 1.0]` relative to frame width/height.
    #[default]
    Normalized,
    /// Absolute pixels.
    Pixel,
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes in one packed RGB24 frame.
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Point2D {
        Point2D {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Vector from `origin` to this point.
    pub fn sub(&self, origin: &Point2D) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }

    /// Scale a normalized point to pixel coordinates.
    pub fn to_pixels(&self, size: FrameSize) -> Point2D {
        Point2D {
            x: self.x * size.width as f64,
            y: self.y * size.height as f64,
        }
    }

    /// Scale a pixel point back to normalized coordinates.
    pub fn to_normalized(&self, size: FrameSize) -> Point2D {
        let w = (size.width as f64).max(1.0);
        let h = (size.height as f64).max(1.0);
        Point2D {
            x: self.x / w,
            y: self.y / h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2d_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_roundtrip() {
        let size = FrameSize::new(640, 480);
        let p = Point2D::new(0.25, 0.5).to_pixels(size);
        assert!((p.x - 160.0).abs() < 1e-9);
        assert!((p.y - 240.0).abs() < 1e-9);

        let back = p.to_normalized(size);
        assert!((back.x - 0.25).abs() < 1e-9);
        assert!((back.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_finite_check() {
        assert!(Point2D::new(0.1, 0.2).is_finite());
        assert!(!Point2D::new(f64::NAN, 0.2).is_finite());
        assert!(!Point2D::new(0.1, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_rgb_len() {
        assert_eq!(FrameSize::new(4, 2).rgb_len(), 24);
        assert!(FrameSize::new(0, 2).is_empty());
    }
}
