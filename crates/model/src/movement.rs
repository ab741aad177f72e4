//! Movement kinds, body sides, and the per-run measurement configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::landmark::{DetectionMode, HandLandmark, Handedness};

/// The measured movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementKind {
    /// Shoulder abduction, measured from the vertical below the shoulder.
    Abduction,
    /// Elbow flexion: shoulder-elbow-wrist.
    Flexion,
    /// Forearm rotation, measured on a tracked hand.
    PronationSupination,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abduction => "abduction",
            Self::Flexion => "flexion",
            Self::PronationSupination => "pronation-supination",
        }
    }

    /// Landmark model the movement needs.
    pub fn detection_mode(self) -> DetectionMode {
        match self {
            Self::Abduction | Self::Flexion => DetectionMode::Pose,
            Self::PronationSupination => DetectionMode::Hands,
        }
    }

    /// Whether samples are split into pronation/supination ranges.
    pub fn is_dual_state(self) -> bool {
        matches!(self, Self::PronationSupination)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "abduction" | "abduccion" | "abducción" => Ok(Self::Abduction),
            "flexion" | "flexión" => Ok(Self::Flexion),
            "pronation-supination" | "pronosupination" | "pronosupinacion" | "pys" => {
                Ok(Self::PronationSupination)
            }
            _ => Err(ModelError::UnknownMovement {
                value: s.to_string(),
            }),
        }
    }
}

/// Body side. `Both` measures the left and right arm in one pass and is
/// only valid for flexion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Both,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Both => "both",
        }
    }

    /// Short overlay label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
            Self::Both => "L+R",
        }
    }

    pub fn is_bilateral(self) -> bool {
        matches!(self, Self::Both)
    }

    /// The single arms this side covers, left first.
    pub fn arms(self) -> &'static [Side] {
        match self {
            Self::Left => &[Self::Left],
            Self::Right => &[Self::Right],
            Self::Both => &[Self::Left, Self::Right],
        }
    }

    /// Whether a provider handedness label refers to this side.
    ///
    /// With `mirrored`, the label is inverted once before comparing.
    pub fn matches_handedness(self, reported: Handedness, mirrored: bool) -> bool {
        let label = if mirrored {
            reported.mirrored()
        } else {
            reported
        };
        matches!(
            (self, label),
            (Self::Left, Handedness::Left) | (Self::Right, Handedness::Right) | (Self::Both, _)
        )
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "izquierda" | "l" => Ok(Self::Left),
            "right" | "derecha" | "r" => Ok(Self::Right),
            "both" | "ambos" | "bilateral" => Ok(Self::Both),
            _ => Err(ModelError::UnknownSide {
                value: s.to_string(),
            }),
        }
    }
}

/// Lateral state of a hand pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pronation,
    Supination,
    Neutral,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pronation => "pronation",
            Self::Supination => "supination",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normal (healthy) range for a movement, used to express coverage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Immutable configuration for one measurement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub kind: MovementKind,
    pub side: Side,

    /// Abduction virtual point offset below the shoulder (normalized height).
    pub abduction_virtual_offset: f64,

    /// Pronation/supination virtual point offset above the reference (pixels).
    pub pronation_virtual_offset_px: f64,

    /// Horizontal displacement (pixels) below which a hand pose is neutral.
    pub neutral_threshold_px: f64,

    /// Hand landmark at the angle vertex.
    pub reference_landmark: HandLandmark,

    /// Hand landmark at the moving end.
    pub tip_landmark: HandLandmark,

    /// Invert provider handedness before matching the side.
    pub mirror_handedness: bool,

    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,

    /// Optional normal range for coverage reporting.
    #[serde(default)]
    pub reference_range: Option<ReferenceRange>,
}

impl MovementConfig {
    /// Configuration with the standard clinical constants.
    pub fn new(kind: MovementKind, side: Side) -> Self {
        Self {
            kind,
            side,
            abduction_virtual_offset: 0.1,
            pronation_virtual_offset_px: 40.0,
            neutral_threshold_px: 10.0,
            reference_landmark: HandLandmark::RingFingerTip,
            tip_landmark: HandLandmark::IndexFingerTip,
            mirror_handedness: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            reference_range: None,
        }
    }

    /// Parse movement kind and side from plain input strings.
    pub fn parse(kind: &str, side: &str) -> Result<Self, ModelError> {
        let kind = kind.parse()?;
        let side = side.parse()?;
        Ok(Self::new(kind, side))
    }

    /// The same run restricted to one arm.
    pub fn for_arm(&self, arm: Side) -> Self {
        Self {
            side: arm,
            ..self.clone()
        }
    }

    /// Check constants before any resource is opened.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |message: String| Err(ModelError::InvalidConfig { message });

        if self.side.is_bilateral() && self.kind != MovementKind::Flexion {
            return invalid(format!(
                "both sides in one run are only supported for flexion, not {}",
                self.kind
            ));
        }

        if !(self.abduction_virtual_offset.is_finite() && self.abduction_virtual_offset > 0.0) {
            return invalid(format!(
                "abduction virtual offset must be positive, got {}",
                self.abduction_virtual_offset
            ));
        }
        if !(self.pronation_virtual_offset_px.is_finite() && self.pronation_virtual_offset_px > 0.0)
        {
            return invalid(format!(
                "pronation virtual offset must be positive, got {}",
                self.pronation_virtual_offset_px
            ));
        }
        if !(self.neutral_threshold_px.is_finite() && self.neutral_threshold_px >= 0.0) {
            return invalid(format!(
                "neutral threshold must be non-negative, got {}",
                self.neutral_threshold_px
            ));
        }
        if self.reference_landmark == self.tip_landmark {
            return invalid(format!(
                "reference and tip landmarks must differ (both {})",
                self.reference_landmark.as_str()
            ));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if let Some(reference) = self.reference_range {
            if !(reference.min.is_finite() && reference.max.is_finite())
                || reference.max <= reference.min
            {
                return invalid(format!(
                    "reference range must satisfy min < max, got {}..{}",
                    reference.min, reference.max
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_accepts_spanish_and_english() {
        assert_eq!("derecha".parse::<Side>().unwrap(), Side::Right);
        assert_eq!("Izquierda".parse::<Side>().unwrap(), Side::Left);
        assert_eq!(" RIGHT ".parse::<Side>().unwrap(), Side::Right);
        assert!(matches!(
            "arriba".parse::<Side>(),
            Err(ModelError::UnknownSide { .. })
        ));
    }

    #[test]
    fn test_bilateral_side_is_flexion_only() {
        assert_eq!("ambos".parse::<Side>().unwrap(), Side::Both);
        assert_eq!("Both".parse::<Side>().unwrap(), Side::Both);
        assert_eq!(Side::Both.arms(), &[Side::Left, Side::Right]);
        assert_eq!(Side::Right.arms(), &[Side::Right]);

        let config = MovementConfig::parse("flexion", "both").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.for_arm(Side::Right).side, Side::Right);

        for kind in ["abduction", "pys"] {
            let err = MovementConfig::parse(kind, "ambos")
                .unwrap()
                .validate()
                .unwrap_err();
            assert!(matches!(err, ModelError::InvalidConfig { .. }));
        }
    }

    #[test]
    fn test_movement_aliases() {
        assert_eq!(
            "abduccion".parse::<MovementKind>().unwrap(),
            MovementKind::Abduction
        );
        assert_eq!("Flexion".parse::<MovementKind>().unwrap(), MovementKind::Flexion);
        assert_eq!(
            "pronation_supination".parse::<MovementKind>().unwrap(),
            MovementKind::PronationSupination
        );
        assert_eq!(
            "pys".parse::<MovementKind>().unwrap(),
            MovementKind::PronationSupination
        );
        assert!("rotation".parse::<MovementKind>().is_err());
    }

    #[test]
    fn test_handedness_matching_with_mirror() {
        // Provider says "Left" for what is anatomically the right hand.
        assert!(Side::Right.matches_handedness(Handedness::Left, true));
        assert!(!Side::Right.matches_handedness(Handedness::Right, true));
        assert!(Side::Right.matches_handedness(Handedness::Right, false));
    }

    #[test]
    fn test_detection_mode_per_kind() {
        assert_eq!(MovementKind::Flexion.detection_mode(), DetectionMode::Pose);
        assert_eq!(
            MovementKind::PronationSupination.detection_mode(),
            DetectionMode::Hands
        );
        assert!(MovementKind::PronationSupination.is_dual_state());
        assert!(!MovementKind::Abduction.is_dual_state());
    }

    #[test]
    fn test_parse_fails_fast_on_bad_side() {
        let err = MovementConfig::parse("flexion", "center").unwrap_err();
        assert!(err.to_string().contains("center"));
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let mut config = MovementConfig::new(MovementKind::Abduction, Side::Left);
        assert!(config.validate().is_ok());

        config.abduction_virtual_offset = 0.0;
        assert!(config.validate().is_err());

        let mut config = MovementConfig::new(MovementKind::PronationSupination, Side::Left);
        config.tip_landmark = config.reference_landmark;
        assert!(config.validate().is_err());

        let mut config = MovementConfig::new(MovementKind::Flexion, Side::Right);
        config.reference_range = Some(ReferenceRange {
            min: 150.0,
            max: 0.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&MovementKind::PronationSupination).unwrap();
        assert_eq!(json, "\"pronation-supination\"");
    }
}
