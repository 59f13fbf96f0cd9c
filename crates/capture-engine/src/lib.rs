//! Burnsub Capture Engine
//!
//! Drives a playback source frame by frame, burns the karaoke caption
//! overlay into each frame, and streams the result through an encoder.
//! Only one export session may run at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 BurnInExporter                   │
//! │  probe ──► codec selection ──► CaptureSession    │
//! │                                                  │
//! │  ┌────────────────┐   ┌──────────────────────┐   │
//! │  │ PlaybackSource │──►│  FrameCompositor     │   │
//! │  │ (ffmpeg decode)│   │  frame + captions    │   │
//! │  └────────────────┘   └──────────┬───────────┘   │
//! │                                  ▼               │
//! │                       ┌──────────────────────┐   │
//! │                       │ EncoderSink (ffmpeg) │   │
//! │                       └──────────┬───────────┘   │
//! │                                  ▼               │
//! │                   <stem>-<stamp>.webm|mp4        │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod encoder;
pub mod export;
pub mod probe;
pub mod session;
pub mod source;

pub use codec::{select_codec, CodecProfile, CodecSupport, Container, FfmpegCapabilities};
pub use encoder::{EncoderFactory, EncoderSettings, EncoderSink, EncoderStats, FfmpegEncoderFactory};
pub use export::{
    artifact_file_name, BurnInExporter, BurnInJob, ExportArtifact, ExportProgress, ExportStage,
    ProgressCallback,
};
pub use probe::{probe_media, MediaInfo};
pub use session::{CaptureSession, SessionConfig, SessionOutput, SessionState};
pub use source::{AudioTrack, FfmpegPlaybackSource, PlaybackSource, SavedPlaybackState};
