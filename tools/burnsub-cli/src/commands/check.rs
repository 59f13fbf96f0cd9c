//! Check system capabilities.

use burnsub_capture_engine::probe::command_exists;
use burnsub_capture_engine::{select_codec, FfmpegCapabilities};
use burnsub_common::config::{config_file_path, AppConfig};
use burnsub_render_engine::{load_font, FontSource, Typeface};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("burnsub System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[FAIL] {binary} not found on PATH");
            ready = false;
        }
    }

    if command_exists("ffmpeg") {
        match FfmpegCapabilities::probe().and_then(|caps| select_codec(&caps)) {
            Ok(profile) => println!(
                "[OK] Output codec: {} (.{})",
                profile.mime,
                profile.container.extension()
            ),
            Err(e) => {
                println!("[FAIL] {e}");
                ready = false;
            }
        }
    }

    let font_source = FontSource::from_option(config.style.font_path.clone());
    match load_font(font_source).await {
        Ok(font) => println!("[OK] Caption font: {}", font.name()),
        Err(e) => {
            println!("[FAIL] Caption font: {e}");
            ready = false;
        }
    }

    println!("     Config: {}", config_file_path().display());
    println!("     Output directory: {}", config.export.output_dir.display());

    println!();
    if ready {
        println!("All required capabilities are available. burnsub is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
