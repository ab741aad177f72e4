//! Check system capabilities.

use std::path::Path;

use gonio_common::config::{config_file_path, AppConfig};
use gonio_video::command_exists;
use gonio_video::overlay::SYSTEM_FONTS;

pub fn run(app: &AppConfig, config: Option<&Path>) -> anyhow::Result<()> {
    println!("Gonio System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for binary in [&app.video.ffmpeg, &app.video.ffprobe] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[WARN] {binary} not found on PATH");
            ready = false;
        }
    }

    let config_path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not present)", config_path.display());
    }
    println!("     Output directory: {}", app.output_dir.display());
    println!(
        "     Codec: {} (crf {}), fallback fps {}",
        app.video.codec, app.video.crf, app.video.fallback_fps
    );

    match &app.annotation.font_path {
        Some(font) if font.exists() => println!("[OK] Caption font: {}", font.display()),
        Some(font) => {
            println!("[WARN] Caption font missing: {}", font.display());
            ready = false;
        }
        None => match SYSTEM_FONTS.iter().map(Path::new).find(|p| p.is_file()) {
            Some(font) => println!("[OK] Caption font: {} (system)", font.display()),
            None => println!("[WARN] No caption font found; angle text will not be drawn"),
        },
    }

    println!();
    if ready {
        println!("All required tools are available. Gonio is ready.");
    } else {
        println!("Some requirements are missing. See above for fixes.");
    }

    Ok(())
}
