//! Movement strategies: which three points a movement measures.
//!
//! Every strategy yields `(reference, vertex, moving)`; the angle is taken
//! at `vertex`. Abduction and pronation/supination use a synthesized
//! reference point instead of a detected landmark:
//!
//! | Movement | reference | vertex | moving | space |
//! |---|---|---|---|---|
//! | Abduction | shoulder + offset downward | shoulder | elbow | normalized |
//! | Flexion | shoulder | elbow | wrist | normalized |
//! | Pronation/supination | reference knuckle − offset upward | reference knuckle | fingertip | pixels |

use gonio_model::landmark::{HandLandmark, HandLandmarks, LandmarkFrame, PoseLandmark};
use gonio_model::movement::{Category, MovementConfig, MovementKind, Side};
use gonio_model::point::{CoordinateSpace, FrameSize, Point2D};

use crate::classifier::classify_dx;
use crate::geometry::AngleFormula;

/// The three points of one angle measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedPoints {
    pub reference: Point2D,
    pub vertex: Point2D,
    pub moving: Point2D,
    pub space: CoordinateSpace,
}

impl SelectedPoints {
    /// The points in pixel coordinates, in `(reference, vertex, moving)` order.
    pub fn to_pixels(&self, size: FrameSize) -> [Point2D; 3] {
        match self.space {
            CoordinateSpace::Pixel => [self.reference, self.vertex, self.moving],
            CoordinateSpace::Normalized => [
                self.reference.to_pixels(size),
                self.vertex.to_pixels(size),
                self.moving.to_pixels(size),
            ],
        }
    }
}

/// Result of point selection for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Points(SelectedPoints),
    /// Nothing usable for this movement's detection mode.
    NoDetection,
    /// A detection exists but a required landmark (or matching hand) is missing.
    MissingLandmarks,
}

/// Per-movement point selection and classification policy.
pub trait MovementStrategy: Send + Sync {
    fn kind(&self) -> MovementKind;

    fn side(&self) -> Side;

    /// Formula used for this movement's angle.
    fn formula(&self) -> AngleFormula;

    /// Extract the measured points from one frame's landmarks.
    fn select_points(&self, frame: &LandmarkFrame, size: FrameSize) -> Selection;

    /// Lateral category of a measurement, for dual-state movements.
    fn classify(&self, _points: &SelectedPoints) -> Option<Category> {
        None
    }
}

/// Build the strategy for a run's configuration.
pub fn strategy_for(config: &MovementConfig) -> Box<dyn MovementStrategy> {
    match config.kind {
        MovementKind::Abduction => Box::new(AbductionStrategy {
            side: config.side,
            virtual_offset: config.abduction_virtual_offset,
        }),
        MovementKind::Flexion => Box::new(FlexionStrategy { side: config.side }),
        MovementKind::PronationSupination => Box::new(PronationSupinationStrategy {
            side: config.side,
            virtual_offset_px: config.pronation_virtual_offset_px,
            neutral_threshold_px: config.neutral_threshold_px,
            reference: config.reference_landmark,
            tip: config.tip_landmark,
            mirror_handedness: config.mirror_handedness,
        }),
    }
}

/// One strategy per measured arm, left first.
pub fn arm_strategies(config: &MovementConfig) -> Vec<Box<dyn MovementStrategy>> {
    config
        .side
        .arms()
        .iter()
        .map(|&arm| strategy_for(&config.for_arm(arm)))
        .collect()
}

/// Shoulder, elbow and wrist of one arm. `Both` names no single arm.
fn arm_landmarks(side: Side) -> Option<(PoseLandmark, PoseLandmark, PoseLandmark)> {
    match side {
        Side::Left => Some((
            PoseLandmark::LeftShoulder,
            PoseLandmark::LeftElbow,
            PoseLandmark::LeftWrist,
        )),
        Side::Right => Some((
            PoseLandmark::RightShoulder,
            PoseLandmark::RightElbow,
            PoseLandmark::RightWrist,
        )),
        Side::Both => None,
    }
}

/// Shoulder abduction: angle between the vertical below the shoulder and
/// the upper arm.
#[derive(Debug, Clone)]
pub struct AbductionStrategy {
    pub side: Side,
    /// Fraction of normalized frame height.
    pub virtual_offset: f64,
}

impl MovementStrategy for AbductionStrategy {
    fn kind(&self) -> MovementKind {
        MovementKind::Abduction
    }

    fn side(&self) -> Side {
        self.side
    }

    fn formula(&self) -> AngleFormula {
        AngleFormula::DotProduct
    }

    fn select_points(&self, frame: &LandmarkFrame, _size: FrameSize) -> Selection {
        let Some(pose) = frame.pose.as_ref().filter(|p| !p.points.is_empty()) else {
            return Selection::NoDetection;
        };
        let Some((shoulder_lm, elbow_lm, _)) = arm_landmarks(self.side) else {
            return Selection::MissingLandmarks;
        };
        let (Some(shoulder), Some(elbow)) = (pose.get(shoulder_lm), pose.get(elbow_lm)) else {
            return Selection::MissingLandmarks;
        };

        // Image y grows downward.
        Selection::Points(SelectedPoints {
            reference: shoulder.offset(0.0, self.virtual_offset),
            vertex: shoulder,
            moving: elbow,
            space: CoordinateSpace::Normalized,
        })
    }
}

/// Elbow flexion: shoulder-elbow-wrist.
#[derive(Debug, Clone)]
pub struct FlexionStrategy {
    pub side: Side,
}

impl MovementStrategy for FlexionStrategy {
    fn kind(&self) -> MovementKind {
        MovementKind::Flexion
    }

    fn side(&self) -> Side {
        self.side
    }

    fn formula(&self) -> AngleFormula {
        AngleFormula::DotProduct
    }

    fn select_points(&self, frame: &LandmarkFrame, _size: FrameSize) -> Selection {
        let Some(pose) = frame.pose.as_ref().filter(|p| !p.points.is_empty()) else {
            return Selection::NoDetection;
        };
        let Some((shoulder_lm, elbow_lm, wrist_lm)) = arm_landmarks(self.side) else {
            return Selection::MissingLandmarks;
        };
        match (pose.get(shoulder_lm), pose.get(elbow_lm), pose.get(wrist_lm)) {
            (Some(shoulder), Some(elbow), Some(wrist)) => Selection::Points(SelectedPoints {
                reference: shoulder,
                vertex: elbow,
                moving: wrist,
                space: CoordinateSpace::Normalized,
            }),
            _ => Selection::MissingLandmarks,
        }
    }
}

/// Forearm pronation/supination measured on the configured hand.
#[derive(Debug, Clone)]
pub struct PronationSupinationStrategy {
    pub side: Side,
    pub virtual_offset_px: f64,
    pub neutral_threshold_px: f64,
    pub reference: HandLandmark,
    pub tip: HandLandmark,
    pub mirror_handedness: bool,
}

impl PronationSupinationStrategy {
    /// First detected hand whose (mirrored) handedness matches the side.
    pub fn matching_hand<'a>(&self, frame: &'a LandmarkFrame) -> Option<&'a HandLandmarks> {
        frame.hands.iter().find(|hand| {
            self.side
                .matches_handedness(hand.handedness, self.mirror_handedness)
        })
    }
}

impl MovementStrategy for PronationSupinationStrategy {
    fn kind(&self) -> MovementKind {
        MovementKind::PronationSupination
    }

    fn side(&self) -> Side {
        self.side
    }

    fn formula(&self) -> AngleFormula {
        AngleFormula::Atan2Folded
    }

    fn select_points(&self, frame: &LandmarkFrame, size: FrameSize) -> Selection {
        if frame.hands.is_empty() {
            return Selection::NoDetection;
        }
        let Some(hand) = self.matching_hand(frame) else {
            return Selection::MissingLandmarks;
        };
        let (Some(base), Some(tip)) = (hand.get(self.reference), hand.get(self.tip)) else {
            return Selection::MissingLandmarks;
        };

        let base = base.to_pixels(size);
        let tip = tip.to_pixels(size);
        Selection::Points(SelectedPoints {
            reference: base.offset(0.0, -self.virtual_offset_px),
            vertex: base,
            moving: tip,
            space: CoordinateSpace::Pixel,
        })
    }

    fn classify(&self, points: &SelectedPoints) -> Option<Category> {
        let dx = points.moving.x - points.vertex.x;
        Some(classify_dx(dx, self.side, self.neutral_threshold_px))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonio_model::landmark::{Handedness, Landmark, PoseLandmarks};

    const SIZE: FrameSize = FrameSize {
        width: 1000,
        height: 500,
    };

    fn pose_frame(points: &[(PoseLandmark, f64, f64)]) -> LandmarkFrame {
        let mut pose = PoseLandmarks::default();
        for &(lm, x, y) in points {
            pose.set(lm, Point2D::new(x, y));
        }
        LandmarkFrame::with_pose(0, pose)
    }

    fn hand(handedness: Handedness, base: (f64, f64), tip: (f64, f64)) -> HandLandmarks {
        let mut points = vec![None; 21];
        points[HandLandmark::RingFingerTip.index()] = Some(Landmark::new(base.0, base.1));
        points[HandLandmark::IndexFingerTip.index()] = Some(Landmark::new(tip.0, tip.1));
        HandLandmarks::new(handedness, points)
    }

    #[test]
    fn test_abduction_uses_virtual_point_below_shoulder() {
        let config = MovementConfig::new(MovementKind::Abduction, Side::Right);
        let strategy = strategy_for(&config);
        let frame = pose_frame(&[
            (PoseLandmark::RightShoulder, 0.5, 0.5),
            (PoseLandmark::RightElbow, 0.7, 0.5),
            (PoseLandmark::LeftShoulder, 0.1, 0.1),
        ]);

        let Selection::Points(points) = strategy.select_points(&frame, SIZE) else {
            panic!("expected points");
        };
        assert_eq!(points.vertex, Point2D::new(0.5, 0.5));
        assert!((points.reference.y - 0.6).abs() < 1e-12);
        assert_eq!(points.moving, Point2D::new(0.7, 0.5));
        assert_eq!(points.space, CoordinateSpace::Normalized);
        assert_eq!(strategy.classify(&points), None);
    }

    #[test]
    fn test_flexion_selects_configured_side() {
        let config = MovementConfig::new(MovementKind::Flexion, Side::Left);
        let strategy = strategy_for(&config);
        let frame = pose_frame(&[
            (PoseLandmark::LeftShoulder, 0.2, 0.2),
            (PoseLandmark::LeftElbow, 0.2, 0.4),
            (PoseLandmark::LeftWrist, 0.4, 0.4),
            (PoseLandmark::RightShoulder, 0.8, 0.2),
        ]);

        let Selection::Points(points) = strategy.select_points(&frame, SIZE) else {
            panic!("expected points");
        };
        assert_eq!(points.reference, Point2D::new(0.2, 0.2));
        assert_eq!(points.vertex, Point2D::new(0.2, 0.4));
        assert_eq!(points.moving, Point2D::new(0.4, 0.4));
    }

    #[test]
    fn test_bilateral_flexion_builds_one_strategy_per_arm() {
        let config = MovementConfig::new(MovementKind::Flexion, Side::Both);
        let strategies = arm_strategies(&config);
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].side(), Side::Left);
        assert_eq!(strategies[1].side(), Side::Right);

        let frame = pose_frame(&[
            (PoseLandmark::LeftShoulder, 0.2, 0.2),
            (PoseLandmark::LeftElbow, 0.2, 0.4),
            (PoseLandmark::LeftWrist, 0.4, 0.4),
            (PoseLandmark::RightShoulder, 0.8, 0.2),
            (PoseLandmark::RightElbow, 0.8, 0.4),
            (PoseLandmark::RightWrist, 0.8, 0.6),
        ]);
        let Selection::Points(right) = strategies[1].select_points(&frame, SIZE) else {
            panic!("expected points");
        };
        assert_eq!(right.vertex, Point2D::new(0.8, 0.4));

        let single = arm_strategies(&MovementConfig::new(MovementKind::Flexion, Side::Right));
        assert_eq!(single.len(), 1);
        assert_eq!(
            strategy_for(&config).select_points(&frame, SIZE),
            Selection::MissingLandmarks
        );
    }

    #[test]
    fn test_missing_landmark_is_reported() {
        let config = MovementConfig::new(MovementKind::Flexion, Side::Right);
        let strategy = strategy_for(&config);
        let frame = pose_frame(&[
            (PoseLandmark::RightShoulder, 0.8, 0.2),
            (PoseLandmark::RightElbow, 0.8, 0.4),
        ]);
        assert_eq!(
            strategy.select_points(&frame, SIZE),
            Selection::MissingLandmarks
        );
        assert_eq!(
            strategy.select_points(&LandmarkFrame::default(), SIZE),
            Selection::NoDetection
        );
    }

    #[test]
    fn test_pronation_picks_mirrored_hand_in_pixels() {
        let config = MovementConfig::new(MovementKind::PronationSupination, Side::Right);
        let strategy = strategy_for(&config);
        // Provider "Right" is anatomically left; provider "Left" is the right hand.
        let frame = LandmarkFrame::with_hands(
            0,
            vec![
                hand(Handedness::Right, (0.1, 0.1), (0.2, 0.1)),
                hand(Handedness::Left, (0.5, 0.5), (0.52, 0.4)),
            ],
        );

        let Selection::Points(points) = strategy.select_points(&frame, SIZE) else {
            panic!("expected points");
        };
        assert_eq!(points.space, CoordinateSpace::Pixel);
        assert!((points.vertex.x - 500.0).abs() < 1e-9);
        assert!((points.vertex.y - 250.0).abs() < 1e-9);
        assert!((points.reference.y - 210.0).abs() < 1e-9);
        assert!((points.moving.x - 520.0).abs() < 1e-9);
        assert_eq!(strategy.classify(&points), Some(Category::Pronation));
    }

    #[test]
    fn test_pronation_without_matching_hand() {
        let config = MovementConfig::new(MovementKind::PronationSupination, Side::Left);
        let strategy = strategy_for(&config);
        let frame = LandmarkFrame::with_hands(0, vec![hand(Handedness::Left, (0.5, 0.5), (0.6, 0.5))]);
        assert_eq!(
            strategy.select_points(&frame, SIZE),
            Selection::MissingLandmarks
        );
    }

    #[test]
    fn test_formula_per_kind() {
        let abduction = strategy_for(&MovementConfig::new(MovementKind::Abduction, Side::Left));
        let pys = strategy_for(&MovementConfig::new(
            MovementKind::PronationSupination,
            Side::Left,
        ));
        assert_eq!(abduction.formula(), AngleFormula::DotProduct);
        assert_eq!(pys.formula(), AngleFormula::Atan2Folded);
        assert_eq!(pys.side(), Side::Left);
        assert_eq!(pys.kind(), MovementKind::PronationSupination);
    }

    #[test]
    fn test_to_pixels_scales_normalized_points() {
        let points = SelectedPoints {
            reference: Point2D::new(0.5, 0.6),
            vertex: Point2D::new(0.5, 0.5),
            moving: Point2D::new(0.7, 0.5),
            space: CoordinateSpace::Normalized,
        };
        let [r, v, m] = points.to_pixels(SIZE);
        assert!((r.y - 300.0).abs() < 1e-9);
        assert!((v.x - 500.0).abs() < 1e-9);
        assert!((m.x - 700.0).abs() < 1e-9);
    }
}
