//! Burn captions into a video.

use std::io::Write;
use std::path::{Path, PathBuf};

use burnsub_caption_model::{CaptionTrack, Segment};
use burnsub_capture_engine::{
    probe_media, BurnInExporter, BurnInJob, ExportProgress, ProgressCallback,
};
use burnsub_common::config::AppConfig;
use burnsub_common::lock::SessionLock;
use burnsub_processing_core::{Segmenter, SegmenterConfig};
use burnsub_transcript::load_transcript;

use crate::StyleArgs;

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    transcript: Option<PathBuf>,
    segments: Option<PathBuf>,
    output: Option<PathBuf>,
    style: StyleArgs,
    report: bool,
) -> anyhow::Result<()> {
    let segments = match (transcript, segments) {
        (_, Some(path)) => CaptionTrack::load(&path)?.segments,
        (Some(path), None) => {
            let media = probe_media(&video)
                .map_err(|e| anyhow::anyhow!("Failed to read video: {e}"))?;
            segments_from_transcript(&path, media.duration_secs, config)?
        }
        (None, None) => anyhow::bail!("Pass --transcript or --segments"),
    };

    println!("Burning captions into: {}", video.display());
    println!("  Segments: {}", segments.len());

    let job = BurnInJob {
        video_path: video,
        segments,
        style: style.render_style(config),
        font: style.font_source(config),
        output_dir: output,
        write_report: report,
    };

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    let exporter = BurnInExporter::new(SessionLock::new(), config.export.clone());
    let artifact = exporter
        .export(job, Some(progress_cb))
        .await
        .map_err(|e| anyhow::anyhow!("\nExport failed: {e}"))?;

    println!("\nExport complete: {}", artifact.path.display());
    println!("  Format: {}", artifact.mime);
    println!("  Frames: {}", artifact.frames);
    println!("  Size: {} bytes", artifact.bytes);
    if !artifact.audio_included {
        println!("  [WARN] Source audio could not be captured; output is video only");
    }
    if let Some(report) = artifact.report_path {
        println!("  Report: {}", report.display());
    }
    Ok(())
}

/// Segment a transcript against the clip it captions. Transcripts without
/// word timing become one caption spanning the whole clip.
fn segments_from_transcript(
    path: &Path,
    clip_duration_secs: f64,
    config: &AppConfig,
) -> anyhow::Result<Vec<Segment>> {
    let transcript = load_transcript(path, Some(clip_duration_secs))
        .map_err(|e| anyhow::anyhow!("Failed to load transcript: {e}"))?;
    Ok(Segmenter::new(SegmenterConfig::from(&config.segmentation)).segment_transcript(&transcript))
}
