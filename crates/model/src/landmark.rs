//! Landmark types produced by an external pose/hand landmark provider.
//!
//! A landmark stream is stored as JSONL: one [`LandmarkFrame`] per line,
//! keyed by frame index. Lines starting with `#` are headers/comments.
//! Frames without a line, or with neither pose nor hands, mean "no detection".
//!
//! Indices follow the MediaPipe Pose (33 points) and Hands (21 points) layouts.
//! Occluded points may be `null`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::point::Point2D;

/// Body landmarks used by the arm measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftHip = 23,
    RightHip = 24,
}

impl PoseLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pose connections drawn on annotated frames.
pub const POSE_ARM_CONNECTIONS: [(PoseLandmark, PoseLandmark); 7] = [
    (PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder),
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow),
    (PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
    (PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    (PoseLandmark::RightElbow, PoseLandmark::RightWrist),
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftHip),
    (PoseLandmark::RightShoulder, PoseLandmark::RightHip),
];

/// Hand landmarks (MediaPipe Hands layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexFingerMcp = 5,
    IndexFingerPip = 6,
    IndexFingerDip = 7,
    IndexFingerTip = 8,
    MiddleFingerMcp = 9,
    MiddleFingerPip = 10,
    MiddleFingerDip = 11,
    MiddleFingerTip = 12,
    RingFingerMcp = 13,
    RingFingerPip = 14,
    RingFingerDip = 15,
    RingFingerTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

const HAND_LANDMARK_NAMES: [(&str, HandLandmark); 21] = [
    ("wrist", HandLandmark::Wrist),
    ("thumb_cmc", HandLandmark::ThumbCmc),
    ("thumb_mcp", HandLandmark::ThumbMcp),
    ("thumb_ip", HandLandmark::ThumbIp),
    ("thumb_tip", HandLandmark::ThumbTip),
    ("index_finger_mcp", HandLandmark::IndexFingerMcp),
    ("index_finger_pip", HandLandmark::IndexFingerPip),
    ("index_finger_dip", HandLandmark::IndexFingerDip),
    ("index_finger_tip", HandLandmark::IndexFingerTip),
    ("middle_finger_mcp", HandLandmark::MiddleFingerMcp),
    ("middle_finger_pip", HandLandmark::MiddleFingerPip),
    ("middle_finger_dip", HandLandmark::MiddleFingerDip),
    ("middle_finger_tip", HandLandmark::MiddleFingerTip),
    ("ring_finger_mcp", HandLandmark::RingFingerMcp),
    ("ring_finger_pip", HandLandmark::RingFingerPip),
    ("ring_finger_dip", HandLandmark::RingFingerDip),
    ("ring_finger_tip", HandLandmark::RingFingerTip),
    ("pinky_mcp", HandLandmark::PinkyMcp),
    ("pinky_pip", HandLandmark::PinkyPip),
    ("pinky_dip", HandLandmark::PinkyDip),
    ("pinky_tip", HandLandmark::PinkyTip),
];

impl HandLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        HAND_LANDMARK_NAMES[self.index()].0
    }
}

impl FromStr for HandLandmark {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        HAND_LANDMARK_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, lm)| *lm)
            .ok_or_else(|| ModelError::UnknownLandmark {
                value: s.to_string(),
            })
    }
}

/// Hand skeleton connections drawn on annotated frames.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// A single detected point in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth; unused by the 2D measurements.
    #[serde(default)]
    pub z: f64,
    /// Provider visibility/presence score when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: None,
        }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Full-body pose landmarks for one frame, indexed by MediaPipe Pose index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseLandmarks {
    pub points: Vec<Option<Landmark>>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<Option<Landmark>>) -> Self {
        Self { points }
    }

    /// Position of a named landmark, `None` when occluded or out of range.
    pub fn get(&self, landmark: PoseLandmark) -> Option<Point2D> {
        self.points
            .get(landmark.index())
            .copied()
            .flatten()
            .map(|lm| lm.point())
            .filter(Point2D::is_finite)
    }

    /// Set a named landmark, growing the index table as needed.
    pub fn set(&mut self, landmark: PoseLandmark, point: Point2D) {
        let idx = landmark.index();
        if self.points.len() <= idx {
            self.points.resize(idx + 1, None);
        }
        self.points[idx] = Some(Landmark::new(point.x, point.y));
    }
}

/// Handedness label as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[serde(alias = "left", alias = "LEFT")]
    Left,
    #[serde(alias = "right", alias = "RIGHT")]
    Right,
}

impl Handedness {
    /// The opposite label. Providers running on a user-facing camera report
    /// mirror-image handedness.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// One detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub handedness: Handedness,
    /// Handedness classification score.
    #[serde(default)]
    pub score: f64,
    pub points: Vec<Option<Landmark>>,
}

impl HandLandmarks {
    pub fn new(handedness: Handedness, points: Vec<Option<Landmark>>) -> Self {
        Self {
            handedness,
            score: 1.0,
            points,
        }
    }

    /// Position of a hand landmark, `None` when occluded or out of range.
    pub fn get(&self, landmark: HandLandmark) -> Option<Point2D> {
        self.points
            .get(landmark.index())
            .copied()
            .flatten()
            .map(|lm| lm.point())
            .filter(Point2D::is_finite)
    }
}

/// Which landmark model a movement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    Pose,
    Hands,
}

/// Everything the provider detected in one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Zero-based frame index in the source video.
    pub frame: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseLandmarks>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hands: Vec<HandLandmarks>,
}

impl LandmarkFrame {
    /// A frame carrying only pose landmarks.
    pub fn with_pose(frame: u64, pose: PoseLandmarks) -> Self {
        Self {
            frame,
            pose: Some(pose),
            hands: vec![],
        }
    }

    /// A frame carrying only hands.
    pub fn with_hands(frame: u64, hands: Vec<HandLandmarks>) -> Self {
        Self {
            frame,
            pose: None,
            hands,
        }
    }

    /// Whether anything usable for `mode` was detected.
    pub fn has_detection(&self, mode: DetectionMode) -> bool {
        match mode {
            DetectionMode::Pose => self.pose.as_ref().is_some_and(|p| !p.points.is_empty()),
            DetectionMode::Hands => !self.hands.is_empty(),
        }
    }
}

/// Parse landmark frames from JSONL content (one JSON object per line).
pub fn parse_landmark_frames(jsonl: &str) -> Result<Vec<LandmarkFrame>, ModelError> {
    jsonl
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line).map_err(|source| ModelError::ParseLine {
                line: line_no,
                source,
            })
        })
        .collect()
}

/// Serialize landmark frames to JSONL format.
pub fn serialize_landmark_frames(frames: &[LandmarkFrame]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pose_line_with_occlusion() {
        let mut points = vec![None; 33];
        points[12] = Some(Landmark::new(0.5, 0.5));
        let frame = LandmarkFrame::with_pose(4, PoseLandmarks::new(points));
        let jsonl = format!("# header\n{}\n", serde_json::to_string(&frame).unwrap());

        let parsed = parse_landmark_frames(&jsonl).unwrap();
        assert_eq!(parsed.len(), 1);
        let pose = parsed[0].pose.as_ref().unwrap();
        assert_eq!(pose.get(PoseLandmark::RightShoulder), Some(Point2D::new(0.5, 0.5)));
        assert_eq!(pose.get(PoseLandmark::RightElbow), None);
        assert_eq!(pose.get(PoseLandmark::LeftShoulder), None);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let jsonl = "{\"frame\":0}\n\n{\"frame\": oops}\n";
        let err = parse_landmark_frames(jsonl).unwrap_err();
        assert!(matches!(err, ModelError::ParseLine { line: 3, .. }));
    }

    #[test]
    fn test_handedness_accepts_provider_labels() {
        let raw = r#"{"frame":1,"hands":[{"handedness":"Left","score":0.97,"points":[]},{"handedness":"right","points":[]}]}"#;
        let frame: LandmarkFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.hands[0].handedness, Handedness::Left);
        assert_eq!(frame.hands[1].handedness, Handedness::Right);
        assert_eq!(frame.hands[1].score, 0.0);
        assert_eq!(Handedness::Left.mirrored(), Handedness::Right);
    }

    #[test]
    fn test_hand_landmark_names() {
        assert_eq!(
            "ring_finger_tip".parse::<HandLandmark>().unwrap(),
            HandLandmark::RingFingerTip
        );
        assert_eq!(
            "Index-Finger-Tip".parse::<HandLandmark>().unwrap(),
            HandLandmark::IndexFingerTip
        );
        assert!("sixth_finger".parse::<HandLandmark>().is_err());
        assert_eq!(HandLandmark::PinkyTip.as_str(), "pinky_tip");
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
    }

    #[test]
    fn test_detection_presence_per_mode() {
        let empty = LandmarkFrame::default();
        assert!(!empty.has_detection(DetectionMode::Pose));
        assert!(!empty.has_detection(DetectionMode::Hands));

        let mut pose = PoseLandmarks::default();
        pose.set(PoseLandmark::LeftElbow, Point2D::new(0.2, 0.4));
        let frame = LandmarkFrame::with_pose(0, pose);
        assert!(frame.has_detection(DetectionMode::Pose));
        assert!(!frame.has_detection(DetectionMode::Hands));
    }

    #[test]
    fn test_jsonl_serialization_skips_absent_parts() {
        let frames = vec![LandmarkFrame {
            frame: 7,
            pose: None,
            hands: vec![],
        }];
        let jsonl = serialize_landmark_frames(&frames).unwrap();
        assert_eq!(jsonl, "{\"frame\":7}\n");
    }
}
