//! Playback sources: the clock and frames an export is driven by.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use burnsub_common::clock::FrameClock;
use burnsub_common::error::{BurnsubError, BurnsubResult};
use burnsub_render_engine::VideoFrame;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::encoder::drain_to_string;
use crate::probe::MediaInfo;

/// Playback state captured before an export and restored afterward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPlaybackState {
    pub position_secs: f64,
    pub muted: bool,
    pub volume: f32,
}

/// The source's audio, as the encoder should mux it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Media file holding the audio stream.
    pub path: PathBuf,
    /// Linear gain (0 when muted).
    pub gain: f32,
}

/// A seekable, playable media element.
///
/// The source clock is authoritative: `current_time` is the presentation
/// time of the most recently delivered frame.
#[async_trait::async_trait]
pub trait PlaybackSource: Send {
    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    fn pause(&mut self);

    /// Start or resume playback from the current position.
    async fn play(&mut self) -> BurnsubResult<()>;

    /// Begin seeking to `secs`. Completion is signalled by [`Self::seeked`].
    fn request_seek(&mut self, secs: f64);

    /// Resolve once the pending seek has completed.
    async fn seeked(&mut self) -> BurnsubResult<()>;

    /// Wait for the next presented frame. `None` once playback has ended.
    async fn next_frame(&mut self) -> BurnsubResult<Option<VideoFrame>>;

    /// The source's audio track, if one can be captured.
    fn audio_track(&self) -> Option<AudioTrack>;

    fn save_state(&self) -> SavedPlaybackState {
        SavedPlaybackState {
            position_secs: self.current_time(),
            muted: self.muted(),
            volume: self.volume(),
        }
    }
}

/// Decodes a video file through an `ffmpeg` child emitting raw RGBA frames.
///
/// The clock advances exactly one frame per delivered frame at the
/// configured rate, so playback is as fast as the consumer pulls.
pub struct FfmpegPlaybackSource {
    path: PathBuf,
    info: MediaInfo,
    clock: FrameClock,
    position_secs: f64,
    decode_origin_secs: f64,
    frames_decoded: u64,
    paused: bool,
    ended: bool,
    muted: bool,
    volume: f32,
    pending_seek: Option<f64>,
    decoder: Option<DecoderProcess>,
}

/// A running decoder child with its frame pipe and stderr collector.
struct DecoderProcess {
    child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<String>,
}

impl DecoderProcess {
    fn spawn(mut command: Command) -> BurnsubResult<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BurnsubError::render(format!("Failed to start ffmpeg decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BurnsubError::render("Failed to capture ffmpeg decoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BurnsubError::render("Failed to capture ffmpeg decoder stderr"))?;

        Ok(Self {
            child,
            stdout,
            stderr_task: tokio::spawn(drain_to_string(stderr)),
        })
    }

    /// Reap the child after its output ended; a non-zero exit is an error.
    async fn finish(mut self, frames: u64) -> BurnsubResult<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| BurnsubError::render(format!("Failed to wait on ffmpeg decoder: {e}")))?;
        let stderr = self.stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(BurnsubError::render(format!(
                "ffmpeg decoder failed after {frames} frames (status {status}): {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn kill(mut self) {
        if let Err(err) = self.child.start_kill() {
            tracing::debug!(error = %err, "ffmpeg decoder already exited");
        }
        self.stderr_task.abort();
    }
}

/// Outcome of filling one frame buffer from a decoder pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameRead {
    Full,
    /// Clean end of stream on a frame boundary.
    Eof,
    /// Stream ended after this many bytes of a frame.
    Partial(usize),
}

async fn read_frame<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<FrameRead>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(if filled == 0 {
                FrameRead::Eof
            } else {
                FrameRead::Partial(filled)
            });
        }
        filled += n;
    }
    Ok(FrameRead::Full)
}

impl FfmpegPlaybackSource {
    pub fn open(path: impl AsRef<Path>, info: MediaInfo, fps: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            info,
            clock: FrameClock::new(fps),
            position_secs: 0.0,
            decode_origin_secs: 0.0,
            frames_decoded: 0,
            paused: true,
            ended: false,
            muted: false,
            volume: 1.0,
            pending_seek: None,
            decoder: None,
        }
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    fn decoder_args(&self, start_secs: f64) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-ss".to_string(),
            format!("{start_secs:.6}"),
            "-i".to_string(),
            self.path.display().to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!(
                "fps={},scale={}:{}",
                self.clock.fps(),
                self.info.width,
                self.info.height
            ),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "pipe:1".to_string(),
        ]
    }

    fn spawn_decoder(&mut self, start_secs: f64) -> BurnsubResult<()> {
        self.stop_decoder();

        let args = self.decoder_args(start_secs);
        tracing::debug!(args = ?args, "Starting ffmpeg decoder");
        let mut command = Command::new("ffmpeg");
        command.args(&args);
        let decoder = DecoderProcess::spawn(command)?;

        tracing::info!(pid = decoder.child.id(), start_secs, "ffmpeg decoder started");
        self.decoder = Some(decoder);
        self.decode_origin_secs = start_secs;
        self.frames_decoded = 0;
        Ok(())
    }

    fn stop_decoder(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            decoder.kill();
        }
    }

    /// Whether a decoder process is currently attached.
    pub fn is_decoding(&self) -> bool {
        self.decoder.is_some()
    }

    /// The decoder's output ended; reap it and surface any failure.
    async fn end_of_stream(&mut self, partial_bytes: Option<usize>) -> BurnsubResult<()> {
        self.ended = true;
        let frames = self.frames_decoded;
        if let Some(decoder) = self.decoder.take() {
            decoder.finish(frames).await?;
        }
        if let Some(bytes) = partial_bytes {
            return Err(BurnsubError::render(format!(
                "ffmpeg decoder stopped mid-frame after {frames} frames ({bytes} of {} bytes)",
                self.frame_len()
            )));
        }
        tracing::debug!(frames, "ffmpeg decoder reached end of stream");
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlaybackSource for FfmpegPlaybackSource {
    fn current_time(&self) -> f64 {
        self.position_secs
    }

    fn duration(&self) -> f64 {
        self.info.duration_secs
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    async fn play(&mut self) -> BurnsubResult<()> {
        if self.decoder.is_none() {
            self.spawn_decoder(self.position_secs)?;
        }
        self.paused = false;
        Ok(())
    }

    fn request_seek(&mut self, secs: f64) {
        let target = secs.clamp(0.0, self.info.duration_secs.max(0.0));
        self.stop_decoder();
        self.position_secs = target;
        self.ended = false;
        self.pending_seek = Some(target);
    }

    /// Seeks complete immediately; the decoder restarts from the new
    /// position on the next [`PlaybackSource::play`].
    async fn seeked(&mut self) -> BurnsubResult<()> {
        if let Some(target) = self.pending_seek.take() {
            tracing::debug!(target_secs = target, "Seek recorded");
        }
        Ok(())
    }

    async fn next_frame(&mut self) -> BurnsubResult<Option<VideoFrame>> {
        if self.ended {
            return Ok(None);
        }
        if self.paused {
            return Err(BurnsubError::render("Frame requested while playback is paused"));
        }

        let frame_len = self.frame_len();
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(BurnsubError::render("Decoder is not running"));
        };

        let mut data = vec![0u8; frame_len];
        let read = read_frame(&mut decoder.stdout, &mut data)
            .await
            .map_err(|e| BurnsubError::render(format!("Failed reading decoded frame: {e}")))?;
        match read {
            FrameRead::Full => {}
            FrameRead::Eof => {
                self.end_of_stream(None).await?;
                return Ok(None);
            }
            FrameRead::Partial(bytes) => {
                self.end_of_stream(Some(bytes)).await?;
                return Ok(None);
            }
        }

        let pts_secs = self.decode_origin_secs + self.clock.frame_to_secs(self.frames_decoded);
        self.frames_decoded += 1;
        self.position_secs = pts_secs;
        if pts_secs + self.clock.frame_duration_secs() >= self.info.duration_secs {
            self.ended = true;
        }

        Ok(Some(VideoFrame {
            width: self.info.width,
            height: self.info.height,
            data,
            pts_secs,
        }))
    }

    fn audio_track(&self) -> Option<AudioTrack> {
        self.info.has_audio.then(|| AudioTrack {
            path: self.path.clone(),
            gain: if self.muted { 0.0 } else { self.volume },
        })
    }
}

impl Drop for FfmpegPlaybackSource {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}
