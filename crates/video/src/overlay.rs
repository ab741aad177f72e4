//! Frame annotation: skeleton, measured segments, angle gauge, labels.
//!
//! All overlay coordinates are pixels. Drawing outside the frame is
//! clipped by imageproc.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use gonio_common::config::AnnotationConfig;
use gonio_common::error::{GonioError, GonioResult};
use gonio_model::movement::{Category, Side};
use gonio_model::point::Point2D;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
};
use imageproc::rect::Rect;

pub const RIGHT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LEFT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const PRONATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const SUPINATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const NEUTRAL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const BILATERAL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const SKELETON_COLOR: Rgb<u8> = Rgb([220, 220, 220]);
const RING_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const PANEL_COLOR: Rgb<u8> = Rgb([30, 30, 30]);
const GAUGE_WIDTH: u32 = 180;
const GAUGE_HEIGHT: u32 = 14;
const ARC_RADIUS: f64 = 36.0;
const ARC_STEPS: usize = 24;

/// Fonts tried, in order, when no font is configured.
pub const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn side_color(side: Side) -> Rgb<u8> {
    match side {
        Side::Right => RIGHT_COLOR,
        Side::Left => LEFT_COLOR,
        Side::Both => BILATERAL_COLOR,
    }
}

pub fn category_color(category: Category) -> Rgb<u8> {
    match category {
        Category::Pronation => PRONATION_COLOR,
        Category::Supination => SUPINATION_COLOR,
        Category::Neutral => NEUTRAL_COLOR,
    }
}

/// The measured angle drawn on a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMark {
    /// `(reference, vertex, moving)` in pixels.
    pub points: [Point2D; 3],
    /// Degrees.
    pub angle: f64,
    pub color: Rgb<u8>,
    pub category: Option<Category>,
}

/// Everything drawn on one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOverlay {
    /// Detected skeleton segments in pixels.
    pub skeleton: Vec<(Point2D, Point2D)>,
    /// Detected landmark positions in pixels.
    pub landmarks: Vec<Point2D>,
    /// One mark per measured arm.
    pub measurements: Vec<MeasurementMark>,
    /// Text label, e.g. `R: 87`. Needs a font to render.
    pub caption: Option<String>,
}

/// Draws [`FrameOverlay`]s with a fixed style.
pub struct Annotator {
    point_radius: i32,
    line_thickness: i32,
    draw_skeleton: bool,
    font_scale: PxScale,
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("point_radius", &self.point_radius)
            .field("line_thickness", &self.line_thickness)
            .field("draw_skeleton", &self.draw_skeleton)
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Build an annotator. A configured font that cannot be loaded is an
    /// error; without one, the first loadable [`SYSTEM_FONTS`] entry is used.
    pub fn new(config: &AnnotationConfig) -> GonioResult<Self> {
        let font = match config.font_path.as_deref() {
            Some(path) => Some(load_font(path)?),
            None => {
                let font = first_loadable_font(SYSTEM_FONTS);
                if font.is_none() {
                    tracing::warn!(
                        "No system font found; angle captions are not drawn. Set annotation.font_path"
                    );
                }
                font
            }
        };
        Ok(Self {
            point_radius: config.point_radius.max(1),
            line_thickness: config.line_thickness.max(1),
            draw_skeleton: config.draw_skeleton,
            font_scale: PxScale::from(config.font_scale.max(1.0)),
            font,
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn annotate(&self, image: &mut RgbImage, overlay: &FrameOverlay) {
        if self.draw_skeleton {
            for (from, to) in &overlay.skeleton {
                draw_line_segment_mut(image, to_f32(*from), to_f32(*to), SKELETON_COLOR);
            }
            for point in &overlay.landmarks {
                draw_filled_circle_mut(image, to_i32(*point), 3, SKELETON_COLOR);
            }
        }

        for (row, mark) in overlay.measurements.iter().enumerate() {
            self.draw_measurement(image, mark);
            self.draw_gauge(image, mark, gauge_top(row));
        }

        if let (Some(font), Some(caption)) = (&self.font, &overlay.caption) {
            let (w, h) = text_size(self.font_scale, font, caption);
            let top = gauge_top(overlay.measurements.len().max(1)) + 4;
            draw_filled_rect_mut(
                image,
                Rect::at(4, top - 2).of_size(w + 12, h + 8),
                PANEL_COLOR,
            );
            let color = match overlay.measurements.as_slice() {
                [only] => only.color,
                _ => RING_COLOR,
            };
            draw_text_mut(image, color, 10, top, self.font_scale, font, caption);
        }
    }

    fn draw_measurement(&self, image: &mut RgbImage, mark: &MeasurementMark) {
        let [reference, vertex, moving] = mark.points;

        // Reference arm is virtual: draw it thin.
        draw_line_segment_mut(image, to_f32(vertex), to_f32(reference), RING_COLOR);
        draw_thick_line(image, vertex, moving, self.line_thickness, mark.color);
        draw_arc(image, reference, vertex, moving, mark.color);

        for point in [reference, vertex, moving] {
            draw_filled_circle_mut(image, to_i32(point), self.point_radius, mark.color);
            draw_hollow_circle_mut(image, to_i32(point), self.point_radius + 2, RING_COLOR);
        }
    }

    /// Horizontal bar proportional to the angle, with a category swatch.
    fn draw_gauge(&self, image: &mut RgbImage, mark: &MeasurementMark, top: i32) {
        draw_filled_rect_mut(
            image,
            Rect::at(8, top).of_size(GAUGE_WIDTH, GAUGE_HEIGHT),
            PANEL_COLOR,
        );
        let filled = gauge_fill(mark.angle);
        if filled > 0 {
            draw_filled_rect_mut(
                image,
                Rect::at(8, top).of_size(filled, GAUGE_HEIGHT),
                mark.color,
            );
        }
        if let Some(category) = mark.category {
            draw_filled_rect_mut(
                image,
                Rect::at(8 + GAUGE_WIDTH as i32 + 6, top).of_size(GAUGE_HEIGHT, GAUGE_HEIGHT),
                category_color(category),
            );
        }
    }
}

/// Top edge of the gauge in `row`.
fn gauge_top(row: usize) -> i32 {
    8 + row as i32 * (GAUGE_HEIGHT as i32 + 6)
}

/// First candidate that exists and parses as a font.
pub fn first_loadable_font(candidates: &[&str]) -> Option<FontVec> {
    candidates
        .iter()
        .map(Path::new)
        .filter(|path| path.is_file())
        .find_map(|path| match load_font(path) {
            Ok(font) => {
                tracing::debug!(path = %path.display(), "Using system font");
                Some(font)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unusable font");
                None
            }
        })
}

fn load_font(path: &Path) -> GonioResult<FontVec> {
    let bytes = std::fs::read(path).map_err(|e| {
        GonioError::config(format!("Failed to read font {}: {e}", path.display()))
    })?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| GonioError::config(format!("Invalid font {}: {e}", path.display())))
}

/// Gauge fill width in pixels for an angle in degrees.
pub fn gauge_fill(angle: f64) -> u32 {
    let ratio = (angle / 180.0).clamp(0.0, 1.0);
    (ratio * GAUGE_WIDTH as f64).round() as u32
}

fn draw_thick_line(image: &mut RgbImage, from: Point2D, to: Point2D, thickness: i32, color: Rgb<u8>) {
    let (fx, fy) = to_f32(from);
    let (tx, ty) = to_f32(to);
    let half = thickness / 2;
    for offset in -half..=half {
        let o = offset as f32;
        draw_line_segment_mut(image, (fx + o, fy), (tx + o, ty), color);
        draw_line_segment_mut(image, (fx, fy + o), (tx, ty + o), color);
    }
}

/// Arc around `vertex` sweeping the smaller angle from `reference` to `moving`.
fn draw_arc(image: &mut RgbImage, reference: Point2D, vertex: Point2D, moving: Point2D, color: Rgb<u8>) {
    let (ux, uy) = reference.sub(&vertex);
    let (vx, vy) = moving.sub(&vertex);
    let start = uy.atan2(ux);
    let mut sweep = vy.atan2(vx) - start;
    if sweep > std::f64::consts::PI {
        sweep -= std::f64::consts::TAU;
    } else if sweep < -std::f64::consts::PI {
        sweep += std::f64::consts::TAU;
    }

    let point_at = |t: f64| {
        let theta = start + sweep * t;
        (
            (vertex.x + ARC_RADIUS * theta.cos()) as f32,
            (vertex.y + ARC_RADIUS * theta.sin()) as f32,
        )
    };
    let mut prev = point_at(0.0);
    for step in 1..=ARC_STEPS {
        let next = point_at(step as f64 / ARC_STEPS as f64);
        draw_line_segment_mut(image, prev, next, color);
        prev = next;
    }
}

fn to_f32(p: Point2D) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn to_i32(p: Point2D) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
    }

    fn mark(angle: f64, category: Option<Category>) -> MeasurementMark {
        MeasurementMark {
            points: [
                Point2D::new(100.0, 160.0),
                Point2D::new(100.0, 100.0),
                Point2D::new(180.0, 100.0),
            ],
            angle,
            color: RIGHT_COLOR,
            category,
        }
    }

    #[test]
    fn test_measurement_points_are_drawn_in_mark_color() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let mut image = blank(240, 200);
        annotator.annotate(
            &mut image,
            &FrameOverlay {
                measurements: vec![mark(90.0, None)],
                ..Default::default()
            },
        );
        assert_eq!(*image.get_pixel(100, 100), RIGHT_COLOR);
        assert_eq!(*image.get_pixel(180, 100), RIGHT_COLOR);
        // Gauge starts filled at the left edge.
        assert_eq!(*image.get_pixel(10, 12), RIGHT_COLOR);
    }

    #[test]
    fn test_category_swatch_uses_category_color() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let mut image = blank(320, 240);
        annotator.annotate(
            &mut image,
            &FrameOverlay {
                measurements: vec![mark(45.0, Some(Category::Supination))],
                ..Default::default()
            },
        );
        let swatch_x = 8 + GAUGE_WIDTH + 6 + 2;
        assert_eq!(*image.get_pixel(swatch_x, 12), SUPINATION_COLOR);
    }

    #[test]
    fn test_empty_overlay_leaves_frame_untouched() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let mut image = blank(64, 48);
        annotator.annotate(&mut image, &FrameOverlay::default());
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_out_of_frame_points_do_not_panic() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let mut image = blank(32, 32);
        let mut far = mark(120.0, Some(Category::Pronation));
        far.points = [
            Point2D::new(-500.0, -500.0),
            Point2D::new(5000.0, 10.0),
            Point2D::new(10.0, 9000.0),
        ];
        annotator.annotate(
            &mut image,
            &FrameOverlay {
                skeleton: vec![(Point2D::new(-10.0, -10.0), Point2D::new(50.0, 50.0))],
                landmarks: vec![Point2D::new(-3.0, 40.0)],
                measurements: vec![far],
                caption: Some("R 120.0°".to_string()),
            },
        );
    }

    #[test]
    fn test_each_measured_arm_gets_its_own_gauge() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let mut image = blank(320, 240);
        let mut left = mark(90.0, None);
        left.color = LEFT_COLOR;
        annotator.annotate(
            &mut image,
            &FrameOverlay {
                measurements: vec![left, mark(90.0, None)],
                ..Default::default()
            },
        );
        assert_eq!(*image.get_pixel(10, gauge_top(0) as u32 + 4), LEFT_COLOR);
        assert_eq!(*image.get_pixel(10, gauge_top(1) as u32 + 4), RIGHT_COLOR);
    }

    #[test]
    fn test_font_lookup_skips_missing_and_invalid_candidates() {
        let dir = std::env::temp_dir().join("gonio_test_font_lookup");
        std::fs::create_dir_all(&dir).unwrap();
        let garbage = dir.join("not_a_font.ttf");
        std::fs::write(&garbage, b"definitely not a font").unwrap();
        let garbage = garbage.to_string_lossy().into_owned();

        assert!(first_loadable_font(&["/nonexistent/gonio/font.ttf", garbage.as_str()]).is_none());
        assert!(first_loadable_font(&[]).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unconfigured_font_falls_back_to_system_font() {
        let annotator = Annotator::new(&AnnotationConfig::default()).unwrap();
        let installed = first_loadable_font(SYSTEM_FONTS).is_some();
        assert_eq!(annotator.has_font(), installed);
    }

    #[test]
    fn test_gauge_fill_is_clamped() {
        assert_eq!(gauge_fill(0.0), 0);
        assert_eq!(gauge_fill(90.0), GAUGE_WIDTH / 2);
        assert_eq!(gauge_fill(180.0), GAUGE_WIDTH);
        assert_eq!(gauge_fill(400.0), GAUGE_WIDTH);
    }

    #[test]
    fn test_missing_font_is_config_error() {
        let config = AnnotationConfig {
            font_path: Some("/nonexistent/gonio/font.ttf".into()),
            ..Default::default()
        };
        let err = Annotator::new(&config).unwrap_err();
        assert!(matches!(err, GonioError::Config { .. }));
    }

    #[test]
    fn test_side_and_category_colors() {
        assert_eq!(side_color(Side::Right), Rgb([0, 255, 0]));
        assert_eq!(side_color(Side::Left), Rgb([0, 0, 255]));
        assert_eq!(side_color(Side::Both), BILATERAL_COLOR);
        assert_eq!(category_color(Category::Neutral), Rgb([255, 255, 0]));
    }
}
