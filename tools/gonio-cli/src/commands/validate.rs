//! Summarize a landmark JSONL file.

use std::path::PathBuf;

use gonio_analysis::{arm_strategies, Selection};
use gonio_common::config::AppConfig;
use gonio_model::landmark::{parse_landmark_frames, DetectionMode, HandLandmark, Handedness};
use gonio_model::movement::MovementConfig;
use gonio_model::point::FrameSize;

/// Presence checks do not depend on the real frame size.
const NOMINAL_SIZE: FrameSize = FrameSize {
    width: 1000,
    height: 1000,
};

pub fn run(
    app: &AppConfig,
    path: PathBuf,
    movement: Option<String>,
    side: Option<String>,
) -> anyhow::Result<()> {
    println!("Validating landmarks at: {}", path.display());

    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let mut frames =
        parse_landmark_frames(&content).map_err(|e| anyhow::anyhow!("Invalid landmarks: {e}"))?;
    frames.sort_by_key(|f| f.frame);

    let pose = frames
        .iter()
        .filter(|f| f.has_detection(DetectionMode::Pose))
        .count();
    let hands = frames
        .iter()
        .filter(|f| f.has_detection(DetectionMode::Hands))
        .count();
    let count_hand = |handedness: Handedness| {
        frames
            .iter()
            .flat_map(|f| &f.hands)
            .filter(|h| h.handedness == handedness)
            .count()
    };

    println!("  Frames: {}", frames.len());
    if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
        let span = (last.frame - first.frame + 1) as usize;
        println!(
            "  Frame span: {} to {} ({} gap(s))",
            first.frame,
            last.frame,
            span.saturating_sub(frames.len())
        );
    }
    println!("  With pose: {pose}");
    println!("  With hands: {hands}");
    println!(
        "     reported left: {}, reported right: {}",
        count_hand(Handedness::Left),
        count_hand(Handedness::Right)
    );

    let (Some(movement), Some(side)) = (movement, side) else {
        return Ok(());
    };

    let mut config =
        MovementConfig::parse(&movement, &side).map_err(|e| anyhow::anyhow!("{e}"))?;
    config.mirror_handedness = app.analysis.mirror_handedness;
    config.reference_landmark = app
        .analysis
        .reference_landmark
        .parse::<HandLandmark>()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    config.tip_landmark = app
        .analysis
        .tip_landmark
        .parse::<HandLandmark>()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    println!();
    println!("{} ({}):", config.kind, config.side);
    for strategy in arm_strategies(&config) {
        let (mut usable, mut missing, mut empty) = (0usize, 0usize, 0usize);
        for frame in &frames {
            match strategy.select_points(frame, NOMINAL_SIZE) {
                Selection::Points(_) => usable += 1,
                Selection::MissingLandmarks => missing += 1,
                Selection::NoDetection => empty += 1,
            }
        }

        if config.side.is_bilateral() {
            println!("  {}:", strategy.side());
        }
        println!("  Measurable frames: {usable}");
        println!("  Missing landmarks: {missing}");
        println!("  No detection: {empty}");
        if usable == 0 {
            println!("  No frame carries the points this movement needs.");
        }
    }

    Ok(())
}
