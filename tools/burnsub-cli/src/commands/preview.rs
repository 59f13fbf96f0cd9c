//! Print the caption overlay at a playback time.

use std::path::PathBuf;

use burnsub_caption_model::CaptionTrack;
use burnsub_common::config::AppConfig;
use burnsub_common::lock::SessionLock;
use burnsub_render_engine::{load_font, PreviewOverlay};

use crate::StyleArgs;

pub async fn run(
    config: &AppConfig,
    segments: PathBuf,
    at: f64,
    width: u32,
    height: u32,
    style: StyleArgs,
    html: bool,
) -> anyhow::Result<()> {
    let track = CaptionTrack::load(&segments)?;
    let font = load_font(style.font_source(config))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load caption font: {e}"))?;

    let overlay = PreviewOverlay::new(
        SessionLock::new(),
        style.render_style(config),
        config.export.fps,
    );

    match overlay.snapshot(&track.segments, at, (width, height), &font) {
        Some(snapshot) if html => println!("{}", snapshot.to_html()),
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("No caption active at {at:.3}s"),
    }
    Ok(())
}
