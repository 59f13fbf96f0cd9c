//! Burn-in export of a captioned video file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burnsub_caption_model::Segment;
use burnsub_common::clock::SessionClock;
use burnsub_common::config::ExportDefaults;
use burnsub_common::error::{BurnsubError, BurnsubResult};
use burnsub_common::lock::SessionLock;
use burnsub_render_engine::{load_font, plan_caption_frames, FontSource, RenderStyle};

use crate::codec::FfmpegCapabilities;
use crate::encoder::FfmpegEncoderFactory;
use crate::probe::{command_exists, probe_media};
use crate::session::{CaptureSession, SessionConfig, SessionOutput};
use crate::source::FfmpegPlaybackSource;

/// Progress callback for export operations.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress information.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames expected from the source duration.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// A burn-in export request.
#[derive(Debug, Clone)]
pub struct BurnInJob {
    pub video_path: PathBuf,
    pub segments: Vec<Segment>,
    pub style: RenderStyle,
    pub font: FontSource,
    /// Overrides the configured output directory.
    pub output_dir: Option<PathBuf>,
    /// Write a per-frame caption timing report next to the artifact.
    pub write_report: bool,
}

/// Where an export landed.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub bytes: usize,
    pub mime: &'static str,
    pub frames: u64,
    pub audio_included: bool,
}

/// Runs burn-in exports, one at a time.
pub struct BurnInExporter {
    lock: SessionLock,
    defaults: ExportDefaults,
    cancel: Arc<AtomicBool>,
}

impl BurnInExporter {
    pub fn new(lock: SessionLock, defaults: ExportDefaults) -> Self {
        Self {
            lock,
            defaults,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The lock shared with the preview overlay.
    pub fn lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Request cancellation of the running export.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub async fn export(
        &self,
        job: BurnInJob,
        progress: Option<ProgressCallback>,
    ) -> BurnsubResult<ExportArtifact> {
        let _guard = self.lock.try_acquire().ok_or(BurnsubError::SessionBusy)?;
        let clock = SessionClock::start();
        // A finished session leaves the flag set; cancels issued from here
        // on apply to this export.
        self.cancel.store(false, Ordering::SeqCst);

        if !job.video_path.exists() {
            return Err(BurnsubError::FileNotFound {
                path: job.video_path.clone(),
            });
        }
        for binary in ["ffmpeg", "ffprobe"] {
            if !command_exists(binary) {
                return Err(BurnsubError::unsupported(format!(
                    "{binary} was not found on PATH"
                )));
            }
        }

        let info = probe_media(&job.video_path)?;
        let capabilities = FfmpegCapabilities::probe()?;
        let config = SessionConfig::from_defaults(&self.defaults, info.width, info.height);
        let fps = config.fps;

        tracing::info!(
            video = %job.video_path.display(),
            segments = job.segments.len(),
            width = info.width,
            height = info.height,
            fps,
            started_at = %clock.epoch_wall(),
            "Starting burn-in export"
        );

        let mut source = FfmpegPlaybackSource::open(&job.video_path, info, fps);
        let mut session = CaptureSession::with_cancel_flag(config, self.cancel.clone());
        let output = session
            .run(
                &mut source,
                &job.segments,
                job.style,
                load_font(job.font.clone()),
                &capabilities,
                &FfmpegEncoderFactory,
                progress.as_ref(),
            )
            .await?;

        let output_dir = job
            .output_dir
            .clone()
            .unwrap_or_else(|| self.defaults.output_dir.clone());
        std::fs::create_dir_all(&output_dir)?;
        let path = output_dir.join(artifact_file_name(
            &job.video_path,
            &clock.artifact_stamp(),
            output.profile.container.extension(),
        ));
        std::fs::write(&path, &output.artifact)?;

        let report_path = if job.write_report {
            Some(write_caption_report(
                &path,
                &job.segments,
                fps,
                info.duration_secs,
                &output,
            )?)
        } else {
            None
        };

        tracing::info!(
            output = %path.display(),
            bytes = output.artifact.len(),
            frames = output.frames_rendered,
            elapsed_secs = clock.elapsed_secs(),
            "Burn-in export written"
        );

        Ok(ExportArtifact {
            path,
            report_path,
            bytes: output.artifact.len(),
            mime: output.profile.mime,
            frames: output.frames_rendered,
            audio_included: output.audio_included,
        })
    }
}

/// `<stem>-<stamp>.<ext>`
pub fn artifact_file_name(video_path: &Path, stamp: &str, extension: &str) -> String {
    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("{stem}-{stamp}.{extension}")
}

/// Write the frame-by-frame caption timing report beside `artifact_path`.
fn write_caption_report(
    artifact_path: &Path,
    segments: &[Segment],
    fps: u32,
    duration_secs: f64,
    output: &SessionOutput,
) -> BurnsubResult<PathBuf> {
    let plan = plan_caption_frames(segments, fps, duration_secs);
    let captioned_frames = plan.iter().filter(|f| f.segment_index.is_some()).count();
    let frame_gap = plan.len() as i64 - output.frames_rendered as i64;

    let report_path = artifact_path.with_extension("verification.json");
    let report = serde_json::json!({
        "output": artifact_path,
        "mime": output.profile.mime,
        "fps": fps,
        "planned_frames": plan.len(),
        "rendered_frames": output.frames_rendered,
        "captioned_frames": captioned_frames,
        "max_drift_ms": output.max_drift_ms,
        "audio_included": output.audio_included,
        "status": if frame_gap.abs() <= 1 { "ok" } else { "warn" },
        "frames": plan,
    });
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    tracing::info!(report = %report_path.display(), "Wrote caption timing report");
    Ok(report_path)
}
