//! Encoder sinks: turn composited canvas frames into a media byte stream.

use std::process::Stdio;

use burnsub_common::error::{BurnsubError, BurnsubResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::codec::{CodecProfile, Container};
use crate::source::AudioTrack;

/// Size of each stdout read from the encoder.
const CHUNK_SIZE: usize = 64 * 1024;

/// Everything an encoder needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub profile: CodecProfile,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    /// Audio to mux alongside the frames; `None` for video-only output.
    pub audio: Option<AudioTrack>,
}

impl EncoderSettings {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Runtime statistics from an encoder sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderStats {
    pub frames_written: u64,
    pub bytes_out: u64,
    pub chunks_out: u64,
}

/// A running encoder consuming raw RGBA frames.
#[async_trait::async_trait]
pub trait EncoderSink: Send {
    async fn start(&mut self) -> BurnsubResult<()>;

    /// Push one `width * height * 4` RGBA frame.
    async fn write_frame(&mut self, rgba: &[u8]) -> BurnsubResult<()>;

    /// Flush and finalize. Calling it again after success is a no-op.
    async fn stop(&mut self) -> BurnsubResult<()>;

    /// Tear down immediately, discarding output.
    fn abort(&mut self);

    /// Output chunks collected so far, in order.
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    fn is_running(&self) -> bool;

    fn stats(&self) -> EncoderStats;
}

/// Builds encoder sinks for a session.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, settings: &EncoderSettings) -> BurnsubResult<Box<dyn EncoderSink>>;
}

/// Spawns one `ffmpeg` process per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegEncoderFactory;

impl EncoderFactory for FfmpegEncoderFactory {
    fn create(&self, settings: &EncoderSettings) -> BurnsubResult<Box<dyn EncoderSink>> {
        Ok(Box::new(FfmpegEncoderSink::new(settings.clone())))
    }
}

/// ffmpeg command line for an encoder reading raw frames on stdin and
/// writing the container on stdout.
pub fn build_encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", settings.width, settings.height),
        "-r".to_string(),
        settings.fps.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
    ];

    if let Some(audio) = &settings.audio {
        args.push("-i".to_string());
        args.push(audio.path.display().to_string());
    }

    args.push("-map".to_string());
    args.push("0:v:0".to_string());
    if settings.audio.is_some() {
        args.push("-map".to_string());
        args.push("1:a:0?".to_string());
    }

    if let Some(video_encoder) = settings.profile.video_encoder {
        args.push("-c:v".to_string());
        args.push(video_encoder.to_string());
    }
    args.push("-b:v".to_string());
    args.push(format!("{}k", settings.video_bitrate_kbps.max(1000)));
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());

    if let Some(audio) = &settings.audio {
        if let Some(audio_encoder) = settings.profile.audio_encoder {
            args.push("-c:a".to_string());
            args.push(audio_encoder.to_string());
        }
        args.push("-b:a".to_string());
        args.push(format!("{}k", settings.audio_bitrate_kbps.max(64)));
        if (audio.gain - 1.0).abs() > f32::EPSILON {
            args.push("-af".to_string());
            args.push(format!("volume={:.3}", audio.gain));
        }
        args.push("-shortest".to_string());
    }

    args.push("-f".to_string());
    args.push(settings.profile.container.muxer().to_string());
    if settings.profile.container == Container::Mp4 && settings.profile.fragmented {
        args.push("-movflags".to_string());
        args.push("frag_keyframe+empty_moov+default_base_moof".to_string());
    }
    args.push("pipe:1".to_string());
    args
}

/// Encoder backed by an `ffmpeg` child process.
///
/// Frames go to stdin; stdout is collected into chunks on a reader task
/// and stderr is drained concurrently so neither pipe can stall ffmpeg.
pub struct FfmpegEncoderSink {
    settings: EncoderSettings,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_task: Option<JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_task: Option<JoinHandle<String>>,
    chunks: Vec<Vec<u8>>,
    stats: EncoderStats,
    finished: bool,
}

impl FfmpegEncoderSink {
    pub fn new(settings: EncoderSettings) -> Self {
        Self {
            settings,
            child: None,
            stdin: None,
            stdout_task: None,
            stderr_task: None,
            chunks: Vec::new(),
            stats: EncoderStats::default(),
            finished: false,
        }
    }

    async fn join_stderr(&mut self) -> String {
        match self.stderr_task.take() {
            Some(task) => task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
            None => String::new(),
        }
    }
}

#[async_trait::async_trait]
impl EncoderSink for FfmpegEncoderSink {
    async fn start(&mut self) -> BurnsubResult<()> {
        if self.child.is_some() || self.finished {
            return Err(BurnsubError::encoder("Encoder already started"));
        }

        let args = build_encoder_args(&self.settings);
        tracing::debug!(args = ?args, "Running ffmpeg encoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BurnsubError::encoder(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BurnsubError::encoder("Failed to capture ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BurnsubError::encoder("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BurnsubError::encoder("Failed to capture ffmpeg stderr"))?;

        let stderr_task = tokio::spawn(drain_to_string(stderr));

        let stdout_task = tokio::spawn(collect_chunks(stdout));

        tracing::info!(
            pid = child.id(),
            mime = self.settings.profile.mime,
            width = self.settings.width,
            height = self.settings.height,
            fps = self.settings.fps,
            audio = self.settings.audio.is_some(),
            "ffmpeg encoder started"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_task = Some(stdout_task);
        self.stderr_task = Some(stderr_task);
        Ok(())
    }

    async fn write_frame(&mut self, rgba: &[u8]) -> BurnsubResult<()> {
        let expected = self.settings.frame_len();
        if rgba.len() != expected {
            return Err(BurnsubError::encoder(format!(
                "Frame has {} bytes, encoder expects {expected}",
                rgba.len()
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BurnsubError::encoder("Encoder is not running"))?;
        stdin
            .write_all(rgba)
            .await
            .map_err(|e| BurnsubError::encoder(format!("Failed writing frame to ffmpeg: {e}")))?;
        self.stats.frames_written += 1;
        Ok(())
    }

    async fn stop(&mut self) -> BurnsubResult<()> {
        if self.finished {
            return Ok(());
        }
        let Some(mut child) = self.child.take() else {
            return Err(BurnsubError::encoder("Encoder was never started"));
        };
        self.finished = true;

        // Closing stdin signals end of input.
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(err) = stdin.shutdown().await {
                tracing::debug!(error = %err, "ffmpeg stdin already closed");
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BurnsubError::encoder(format!("Failed to wait on ffmpeg: {e}")))?;
        let stdout = match self.stdout_task.take() {
            Some(task) => task
                .await
                .map_err(|e| BurnsubError::encoder(format!("ffmpeg stdout reader failed: {e}")))?
                .map_err(|e| BurnsubError::encoder(format!("Failed reading ffmpeg output: {e}")))?,
            None => Vec::new(),
        };
        let stderr_output = self.join_stderr().await;

        if !status.success() {
            return Err(BurnsubError::encoder(format!(
                "ffmpeg encoder failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        self.stats.chunks_out += stdout.len() as u64;
        self.stats.bytes_out += stdout.iter().map(|c| c.len() as u64).sum::<u64>();
        self.chunks.extend(stdout);

        tracing::info!(
            frames = self.stats.frames_written,
            bytes = self.stats.bytes_out,
            chunks = self.stats.chunks_out,
            "ffmpeg encoder finished"
        );
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.start_kill() {
                tracing::debug!(error = %err, "ffmpeg encoder already exited");
            }
            tracing::warn!(frames = self.stats.frames_written, "ffmpeg encoder aborted");
        }
        if let Some(task) = self.stdout_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.finished = true;
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }

    fn is_running(&self) -> bool {
        self.child.is_some()
    }

    fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }
}

impl Drop for FfmpegEncoderSink {
    fn drop(&mut self) {
        if self.is_running() {
            self.abort();
        }
    }
}

/// Collect a child's output stream into `CHUNK_SIZE`-bounded chunks.
pub(crate) async fn collect_chunks<R>(mut reader: R) -> std::io::Result<Vec<Vec<u8>>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut chunks = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        chunks.push(buf[..n].to_vec());
    }
    Ok(chunks)
}

/// Read a child's diagnostic stream to the end.
pub(crate) async fn drain_to_string<R>(mut reader: R) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut output = String::new();
    match reader.read_to_string(&mut output).await {
        Ok(_) => output,
        Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
    }
}
