//! Builds the overlay for one frame from its landmarks and outcome.

use gonio_analysis::FrameOutcome;
use gonio_model::landmark::{LandmarkFrame, HAND_CONNECTIONS, POSE_ARM_CONNECTIONS};
use gonio_model::movement::{Category, MovementConfig, MovementKind, Side};
use gonio_model::point::{FrameSize, Point2D};
use gonio_video::overlay::{category_color, side_color, FrameOverlay, MeasurementMark};

/// Overlay for a frame with a detection. Frames without one are passed
/// through unannotated, so callers only build overlays for detections.
///
/// `outcomes` holds one entry per measured arm. Only hands whose
/// handedness matches the configured side are drawn.
pub fn build_overlay(
    movement: &MovementConfig,
    landmarks: &LandmarkFrame,
    outcomes: &[(Side, FrameOutcome)],
    size: FrameSize,
) -> FrameOverlay {
    let mut overlay = FrameOverlay::default();

    if let Some(pose) = &landmarks.pose {
        for (from, to) in POSE_ARM_CONNECTIONS {
            if let (Some(a), Some(b)) = (pose.get(from), pose.get(to)) {
                overlay.skeleton.push((a.to_pixels(size), b.to_pixels(size)));
            }
        }
        overlay.landmarks.extend(
            pose.points
                .iter()
                .flatten()
                .map(|lm| lm.point())
                .filter(Point2D::is_finite)
                .map(|p| p.to_pixels(size)),
        );
    }

    let hands = landmarks.hands.iter().filter(|hand| {
        movement
            .side
            .matches_handedness(hand.handedness, movement.mirror_handedness)
    });
    for hand in hands {
        let pixel = |idx: usize| {
            hand.points
                .get(idx)
                .copied()
                .flatten()
                .map(|lm| lm.point())
                .filter(Point2D::is_finite)
                .map(|p| p.to_pixels(size))
        };
        for (from, to) in HAND_CONNECTIONS {
            if let (Some(a), Some(b)) = (pixel(from), pixel(to)) {
                overlay.skeleton.push((a, b));
            }
        }
        overlay
            .landmarks
            .extend((0..hand.points.len()).filter_map(pixel));
    }

    for (arm, outcome) in outcomes {
        if let Some(sample) = outcome.sample() {
            overlay.measurements.push(MeasurementMark {
                points: sample.points.to_pixels(size),
                angle: sample.angle,
                color: match sample.category {
                    Some(category) => category_color(category),
                    None => side_color(*arm),
                },
                category: sample.category,
            });
        }
    }

    overlay.caption = if movement.side.is_bilateral() {
        bilateral_caption(outcomes)
    } else {
        outcomes
            .iter()
            .find_map(|(arm, outcome)| outcome.sample().map(|s| (*arm, s)))
            .map(|(arm, sample)| caption(movement.kind, arm, sample.angle, sample.category))
    };

    overlay
}

/// `R: 87` for single-state movements, `Angle: 87 pronation` otherwise.
pub fn caption(kind: MovementKind, side: Side, angle: f64, category: Option<Category>) -> String {
    match (kind.is_dual_state(), category) {
        (true, Some(category)) => format!("Angle: {angle:.0} {category}"),
        (true, None) => format!("Angle: {angle:.0}"),
        (false, _) => format!("{}: {angle:.0}", side.label()),
    }
}

/// `L: 87  R: --`, or nothing when no arm was measured.
fn bilateral_caption(outcomes: &[(Side, FrameOutcome)]) -> Option<String> {
    if outcomes.iter().all(|(_, outcome)| outcome.sample().is_none()) {
        return None;
    }
    let parts: Vec<String> = outcomes
        .iter()
        .map(|(arm, outcome)| match outcome.sample() {
            Some(sample) => format!("{}: {:.0}", arm.label(), sample.angle),
            None => format!("{}: --", arm.label()),
        })
        .collect();
    Some(parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonio_analysis::{AngleSample, SelectedPoints};
    use gonio_model::landmark::{
        HandLandmark, HandLandmarks, Handedness, Landmark, PoseLandmark, PoseLandmarks,
    };
    use gonio_model::point::CoordinateSpace;
    use gonio_video::overlay::{LEFT_COLOR, RIGHT_COLOR, SUPINATION_COLOR};

    const SIZE: FrameSize = FrameSize {
        width: 100,
        height: 100,
    };

    fn sample(angle: f64, vertex: Point2D) -> AngleSample {
        AngleSample {
            angle,
            category: None,
            points: SelectedPoints {
                reference: vertex.offset(0.0, 0.1),
                vertex,
                moving: vertex.offset(0.2, 0.0),
                space: CoordinateSpace::Normalized,
            },
        }
    }

    fn wrist_hand(handedness: Handedness, x: f64) -> HandLandmarks {
        let mut points = vec![None; 21];
        points[HandLandmark::Wrist.index()] = Some(Landmark::new(x, 0.9));
        points[HandLandmark::ThumbCmc.index()] = Some(Landmark::new(x - 0.05, 0.8));
        HandLandmarks::new(handedness, points)
    }

    #[test]
    fn test_pose_overlay_with_measurement() {
        let mut pose = PoseLandmarks::default();
        pose.set(PoseLandmark::LeftShoulder, Point2D::new(0.5, 0.5));
        pose.set(PoseLandmark::LeftElbow, Point2D::new(0.7, 0.5));
        let frame = LandmarkFrame::with_pose(0, pose);
        let movement = MovementConfig::new(MovementKind::Abduction, Side::Left);

        let overlay = build_overlay(
            &movement,
            &frame,
            &[(
                Side::Left,
                FrameOutcome::Measured(sample(90.0, Point2D::new(0.5, 0.5))),
            )],
            SIZE,
        );
        assert_eq!(overlay.skeleton.len(), 1);
        assert_eq!(overlay.landmarks.len(), 2);
        assert_eq!(overlay.measurements.len(), 1);
        let mark = &overlay.measurements[0];
        assert_eq!(mark.color, LEFT_COLOR);
        assert!((mark.points[0].y - 60.0).abs() < 1e-9);
        assert_eq!(overlay.caption.as_deref(), Some("L: 90"));
    }

    #[test]
    fn test_hand_overlay_without_measurement() {
        // Mirrored: the provider's "Left" is the right hand.
        let frame = LandmarkFrame::with_hands(0, vec![wrist_hand(Handedness::Left, 0.5)]);
        let movement = MovementConfig::new(MovementKind::PronationSupination, Side::Right);

        let overlay = build_overlay(
            &movement,
            &frame,
            &[(Side::Right, FrameOutcome::MissingLandmarks)],
            SIZE,
        );
        assert_eq!(overlay.skeleton.len(), 1);
        assert_eq!(overlay.landmarks.len(), 2);
        assert!(overlay.measurements.is_empty());
        assert!(overlay.caption.is_none());
    }

    #[test]
    fn test_only_the_configured_hand_is_drawn() {
        let frame = LandmarkFrame::with_hands(
            0,
            vec![
                wrist_hand(Handedness::Right, 0.2),
                wrist_hand(Handedness::Left, 0.7),
            ],
        );
        let movement = MovementConfig::new(MovementKind::PronationSupination, Side::Right);
        let overlay = build_overlay(
            &movement,
            &frame,
            &[(Side::Right, FrameOutcome::MissingLandmarks)],
            SIZE,
        );
        assert_eq!(overlay.landmarks.len(), 2);
        assert!(overlay.landmarks.iter().all(|p| p.x > 50.0));

        let mut unmirrored = movement.clone();
        unmirrored.mirror_handedness = false;
        let overlay = build_overlay(
            &unmirrored,
            &frame,
            &[(Side::Right, FrameOutcome::MissingLandmarks)],
            SIZE,
        );
        assert!(overlay.landmarks.iter().all(|p| p.x < 50.0));
    }

    #[test]
    fn test_bilateral_overlay_marks_each_arm() {
        let frame = LandmarkFrame::with_pose(0, PoseLandmarks::default());
        let movement = MovementConfig::new(MovementKind::Flexion, Side::Both);
        let outcomes = [
            (
                Side::Left,
                FrameOutcome::Measured(sample(92.4, Point2D::new(0.3, 0.5))),
            ),
            (
                Side::Right,
                FrameOutcome::Measured(sample(131.0, Point2D::new(0.7, 0.5))),
            ),
        ];

        let overlay = build_overlay(&movement, &frame, &outcomes, SIZE);
        let colors: Vec<_> = overlay.measurements.iter().map(|m| m.color).collect();
        assert_eq!(colors, vec![LEFT_COLOR, RIGHT_COLOR]);
        assert_eq!(overlay.caption.as_deref(), Some("L: 92  R: 131"));

        let partial = [
            (Side::Left, FrameOutcome::MissingLandmarks),
            outcomes[1].clone(),
        ];
        let overlay = build_overlay(&movement, &frame, &partial, SIZE);
        assert_eq!(overlay.measurements.len(), 1);
        assert_eq!(overlay.caption.as_deref(), Some("L: --  R: 131"));
    }

    #[test]
    fn test_caption_formats() {
        assert_eq!(
            caption(MovementKind::Flexion, Side::Right, 87.4, None),
            "R: 87"
        );
        assert_eq!(
            caption(
                MovementKind::PronationSupination,
                Side::Right,
                33.6,
                Some(Category::Supination)
            ),
            "Angle: 34 supination"
        );
        assert_eq!(category_color(Category::Supination), SUPINATION_COLOR);
    }
}
