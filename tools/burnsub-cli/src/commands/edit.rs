//! Edit one segment of a track in place.

use std::path::PathBuf;

use burnsub_caption_model::CaptionTrack;

pub fn run(
    segments: PathBuf,
    index: usize,
    start: Option<f64>,
    end: Option<f64>,
    text: Option<String>,
) -> anyhow::Result<()> {
    if start.is_none() && end.is_none() && text.is_none() {
        anyhow::bail!("Nothing to edit: pass --start, --end, or --text");
    }

    let mut track = CaptionTrack::load(&segments)?;
    let current = track
        .segments
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("Segment {index} does not exist ({} total)", track.len()))?;
    let (current_start, current_end) = (current.start_time, current.end_time);

    if start.is_some() || end.is_some() {
        track.edit_timing(
            index,
            start.unwrap_or(current_start),
            end.unwrap_or(current_end),
        )?;
    }
    if let Some(text) = text {
        track.edit_text(index, text)?;
    }

    track.save(&segments)?;
    println!("Updated segment {index} in {}", segments.display());
    Ok(())
}
