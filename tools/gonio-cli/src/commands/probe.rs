//! Show decoded stream information for a video.

use std::path::PathBuf;

use gonio_common::config::AppConfig;
use gonio_video::{FfmpegBackend, VideoBackend};

pub fn run(app: &AppConfig, path: PathBuf, json: bool) -> anyhow::Result<()> {
    let backend = FfmpegBackend::new(&app.video);
    let info = backend
        .probe(&path)
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Video: {}", path.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    match info.fps {
        Some(fps) => println!("  FPS: {fps:.3}"),
        None => println!(
            "  FPS: unknown (measurements will assume {})",
            app.video.fallback_fps
        ),
    }
    match info.frame_count {
        Some(frames) => println!("  Frames: {frames}"),
        None => println!("  Frames: unknown"),
    }
    if let Some(duration) = info.duration_secs {
        println!("  Duration: {duration:.2}s");
    }
    Ok(())
}
