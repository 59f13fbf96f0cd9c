//! Write subtitle files from a segment track.

use std::path::PathBuf;

use burnsub_caption_model::CaptionTrack;
use burnsub_transcript::save_subtitles;

pub fn run(segments: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let track = CaptionTrack::load(&segments)?;
    save_subtitles(&track.segments, &output)?;
    println!("Wrote {} cues to {}", track.len(), output.display());
    Ok(())
}
