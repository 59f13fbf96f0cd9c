//! Group a transcript into caption segments.

use std::path::PathBuf;

use burnsub_caption_model::CaptionTrack;
use burnsub_common::config::AppConfig;
use burnsub_processing_core::{Segmenter, SegmenterConfig};
use burnsub_transcript::load_transcript;

pub fn run(
    config: &AppConfig,
    transcript: PathBuf,
    output: Option<PathBuf>,
    max_words: Option<usize>,
    pause: Option<f64>,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let transcript = load_transcript(&transcript, duration)
        .map_err(|e| anyhow::anyhow!("Failed to load transcript: {e}"))?;

    let mut segmenter_config = SegmenterConfig::from(&config.segmentation);
    if let Some(max_words) = max_words {
        segmenter_config.max_words = max_words;
    }
    if let Some(pause) = pause {
        segmenter_config.pause_threshold_secs = pause;
    }

    let segments = Segmenter::new(segmenter_config).segment_transcript(&transcript);
    let track = CaptionTrack::new(segments);

    match output {
        Some(path) => {
            track.save(&path)?;
            eprintln!("Wrote {} segments to {}", track.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&track)?),
    }

    Ok(())
}
