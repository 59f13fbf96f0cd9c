//! Capture/encode session management.
//!
//! A session drives a playback source frame by frame, composites the
//! caption overlay onto each frame, and feeds the canvas to an encoder
//! until the source ends. Whatever happens, the source's playback state
//! is put back the way the session found it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use burnsub_caption_model::Segment;
use burnsub_common::clock::{DriftMeasurement, FrameClock, SessionClock};
use burnsub_common::config::ExportDefaults;
use burnsub_common::error::{BurnsubError, BurnsubResult};
use burnsub_render_engine::{FrameCompositor, RenderStyle, Typeface};

use crate::codec::{select_codec, CodecProfile, CodecSupport};
use crate::encoder::{EncoderFactory, EncoderSettings, EncoderSink, EncoderStats};
use crate::export::{ExportProgress, ExportStage, ProgressCallback};
use crate::source::{PlaybackSource, SavedPlaybackState};

/// Drift between encoded timeline and source clock worth a warning.
const DRIFT_WARN_MS: f64 = 100.0;

/// Session parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Canvas width (even).
    pub width: u32,
    /// Canvas height (even).
    pub height: u32,
    /// Capture stream frame rate.
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    /// Bound on waiting for the initial seek to 0.
    pub seek_timeout: Duration,
    /// Bound on waiting for the caption font.
    pub font_timeout: Duration,
}

impl SessionConfig {
    pub fn from_defaults(defaults: &ExportDefaults, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: defaults.fps.max(1),
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
            seek_timeout: Duration::from_millis(defaults.seek_timeout_ms),
            font_timeout: Duration::from_millis(defaults.font_timeout_ms),
        }
    }
}

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Saving playback state, waiting on the font and the seek to 0.
    Preparing,
    /// Frame loop running.
    Capturing,
    /// Encoder stopped; collecting output.
    Finalizing,
    /// Artifact produced.
    Done,
    /// Session ended with an error.
    Failed,
}

impl SessionState {
    fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Capturing)
                | (Capturing, Finalizing)
                | (Finalizing, Done)
                | (Preparing | Capturing | Finalizing, Failed)
        )
    }
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    /// Concatenated encoder output.
    pub artifact: Vec<u8>,
    pub profile: CodecProfile,
    pub frames_rendered: u64,
    /// Source time covered by the rendered frames.
    pub duration_secs: f64,
    pub audio_included: bool,
    /// Largest observed drift between frame count and source clock.
    pub max_drift_ms: f64,
    pub encoder_stats: EncoderStats,
}

/// One export run over a playback source.
pub struct CaptureSession {
    config: SessionConfig,
    state: SessionState,
    cancel: Arc<AtomicBool>,
}

impl CaptureSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_cancel_flag(config, Arc::new(AtomicBool::new(false)))
    }

    /// Create a session observing an externally owned cancellation flag.
    pub fn with_cancel_flag(config: SessionConfig, cancel: Arc<AtomicBool>) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Flag observed once per frame; setting it ends the run with `Cancelled`.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = ?self.state, to = ?next, "Unexpected session state transition");
        }
        tracing::debug!(from = ?self.state, to = ?next, "Session state transition");
        self.state = next;
    }

    /// Run the session to completion.
    ///
    /// `font` resolves to the caption typeface; it is awaited under the
    /// configured font timeout. The source's position, mute state and
    /// volume are restored on every exit path.
    #[allow(clippy::too_many_arguments)]
    pub async fn run<S, T, Fut>(
        &mut self,
        source: &mut S,
        segments: &[Segment],
        style: RenderStyle,
        font: Fut,
        codecs: &dyn CodecSupport,
        encoders: &dyn EncoderFactory,
        progress: Option<&ProgressCallback>,
    ) -> BurnsubResult<SessionOutput>
    where
        S: PlaybackSource + ?Sized,
        T: Typeface,
        Fut: Future<Output = BurnsubResult<T>>,
    {
        if self.state != SessionState::Idle {
            return Err(BurnsubError::render(
                "Capture session has already been used",
            ));
        }

        self.transition(SessionState::Preparing);
        report(progress, 0.0, 0, 0, 0.0, ExportStage::Preparing);

        let saved = source.save_state();
        tracing::info!(
            position_secs = saved.position_secs,
            muted = saved.muted,
            volume = saved.volume,
            segments = segments.len(),
            "Export session preparing"
        );
        source.pause();
        source.set_muted(false);
        source.set_volume(1.0);

        let mut encoder: Option<Box<dyn EncoderSink>> = None;
        let result = self
            .drive(
                source,
                segments,
                style,
                font,
                codecs,
                encoders,
                progress,
                &mut encoder,
            )
            .await;

        // Stop the frame loop before touching the source again.
        self.cancel.store(true, Ordering::SeqCst);
        self.restore(source, saved).await;
        if let Some(sink) = encoder.as_mut() {
            if sink.is_running() {
                sink.abort();
            }
        }

        match &result {
            Ok(output) => {
                self.transition(SessionState::Done);
                report(
                    progress,
                    1.0,
                    output.frames_rendered,
                    output.frames_rendered,
                    0.0,
                    ExportStage::Complete,
                );
                tracing::info!(
                    frames = output.frames_rendered,
                    bytes = output.artifact.len(),
                    mime = output.profile.mime,
                    "Export session finished"
                );
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                report(progress, 0.0, 0, 0, 0.0, ExportStage::Failed);
                tracing::error!(error = %err, kind = %err.kind(), "Export session failed");
            }
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive<S, T, Fut>(
        &mut self,
        source: &mut S,
        segments: &[Segment],
        style: RenderStyle,
        font: Fut,
        codecs: &dyn CodecSupport,
        encoders: &dyn EncoderFactory,
        progress: Option<&ProgressCallback>,
        encoder_slot: &mut Option<Box<dyn EncoderSink>>,
    ) -> BurnsubResult<SessionOutput>
    where
        S: PlaybackSource + ?Sized,
        T: Typeface,
        Fut: Future<Output = BurnsubResult<T>>,
    {
        let font_timeout_ms = self.config.font_timeout.as_millis() as u64;
        let typeface = tokio::time::timeout(self.config.font_timeout, font)
            .await
            .map_err(|_| BurnsubError::FontLoadTimeout {
                timeout_ms: font_timeout_ms,
            })??;

        if source.current_time() != 0.0 {
            let seek_timeout_ms = self.config.seek_timeout.as_millis() as u64;
            source.request_seek(0.0);
            tokio::time::timeout(self.config.seek_timeout, source.seeked())
                .await
                .map_err(|_| BurnsubError::SeekTimeout {
                    target_secs: 0.0,
                    timeout_ms: seek_timeout_ms,
                })??;
            tracing::debug!("Source rewound to 0");
        } else {
            tracing::debug!("Source already at 0; skipping seek");
        }

        let profile = select_codec(codecs)?;

        let audio = source.audio_track();
        if audio.is_none() {
            tracing::warn!("Audio capture unavailable; exporting video only");
        }
        let audio_included = audio.is_some();

        let settings = EncoderSettings {
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
            profile,
            video_bitrate_kbps: self.config.video_bitrate_kbps,
            audio_bitrate_kbps: self.config.audio_bitrate_kbps,
            audio,
        };

        let mut compositor = FrameCompositor::new(
            self.config.width,
            self.config.height,
            style,
            typeface,
            self.config.fps,
        )?;
        tracing::debug!(font = compositor.typeface().name(), "Compositor ready");

        if self.cancel.load(Ordering::SeqCst) {
            tracing::info!("Export cancelled before capture started");
            return Err(BurnsubError::Cancelled);
        }

        let sink = encoder_slot.insert(encoders.create(&settings)?);

        self.transition(SessionState::Capturing);
        sink.start().await?;
        source.play().await?;

        let frame_clock = FrameClock::new(self.config.fps);
        let total_frames = frame_clock.frames_for(source.duration());
        let wall = SessionClock::start();
        let mut frames_rendered = 0u64;
        let mut first_time: Option<f64> = None;
        let mut last_time = 0.0f64;
        let mut max_drift_ms = 0.0f64;

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::info!(frames = frames_rendered, "Export cancelled");
                break;
            }

            let Some(frame) = source.next_frame().await? else {
                break;
            };

            // Read the clock fresh for every frame.
            let t = source.current_time();
            compositor.compose(&frame, segments, t)?;
            sink.write_frame(compositor.frame_bytes()).await?;

            let origin = *first_time.get_or_insert(t);
            last_time = t;
            let drift = DriftMeasurement {
                reference_secs: frame_clock.frame_to_secs(frames_rendered),
                measured_secs: t - origin,
            };
            max_drift_ms = max_drift_ms.max(drift.drift_ms().abs());
            frames_rendered += 1;

            if frames_rendered % u64::from(self.config.fps) == 0 {
                log_drift_check(&drift, frames_rendered);
            }
            report_rendering(progress, frames_rendered, total_frames, wall.elapsed_secs());

            if source.has_ended() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let cancelled = self.cancel.load(Ordering::SeqCst);
        self.transition(SessionState::Finalizing);
        report(
            progress,
            1.0,
            frames_rendered,
            total_frames,
            0.0,
            ExportStage::Finalizing,
        );

        sink.stop().await?;
        let chunks = sink.take_chunks();
        let encoder_stats = sink.stats();

        if cancelled {
            return Err(BurnsubError::Cancelled);
        }

        let artifact = chunks.concat();
        if artifact.is_empty() {
            return Err(BurnsubError::EmptyArtifact);
        }

        Ok(SessionOutput {
            artifact,
            profile,
            frames_rendered,
            duration_secs: first_time.map_or(0.0, |origin| {
                last_time - origin + frame_clock.frame_duration_secs()
            }),
            audio_included,
            max_drift_ms,
            encoder_stats,
        })
    }

    async fn restore<S>(&self, source: &mut S, saved: SavedPlaybackState)
    where
        S: PlaybackSource + ?Sized,
    {
        source.pause();
        if (source.current_time() - saved.position_secs).abs() > f64::EPSILON {
            source.request_seek(saved.position_secs);
            match tokio::time::timeout(self.config.seek_timeout, source.seeked()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "Failed to restore playback position")
                }
                Err(_) => tracing::warn!(
                    position_secs = saved.position_secs,
                    "Restoring playback position timed out"
                ),
            }
        }
        source.set_muted(saved.muted);
        source.set_volume(saved.volume);
        tracing::debug!(
            position_secs = saved.position_secs,
            muted = saved.muted,
            volume = saved.volume,
            "Playback state restored"
        );
    }
}

fn log_drift_check(drift: &DriftMeasurement, frames: u64) {
    if drift.exceeds_threshold_ms(DRIFT_WARN_MS) {
        tracing::warn!(
            frames,
            drift_ms = drift.drift_ms(),
            "Encoded timeline drifted from source clock by more than 100ms"
        );
    } else {
        tracing::debug!(frames, drift_ms = drift.drift_ms(), "Clock drift within threshold");
    }
}

fn report(
    progress: Option<&ProgressCallback>,
    fraction: f64,
    frames_rendered: u64,
    total_frames: u64,
    eta_secs: f64,
    stage: ExportStage,
) {
    if let Some(cb) = progress {
        cb(ExportProgress {
            progress: fraction,
            frames_rendered,
            total_frames,
            eta_secs,
            stage,
        });
    }
}

fn report_rendering(
    progress: Option<&ProgressCallback>,
    frames_rendered: u64,
    total_frames: u64,
    elapsed_secs: f64,
) {
    let fraction = if total_frames == 0 {
        0.0
    } else {
        (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0)
    };
    let eta_secs = if fraction > 0.0 {
        (elapsed_secs / fraction) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);
    report(
        progress,
        fraction,
        frames_rendered,
        total_frames,
        eta_secs,
        ExportStage::Rendering,
    );
}
