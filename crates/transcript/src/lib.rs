//! Burnsub Transcript I/O
//!
//! - **Import:** word-timestamp JSON (bare word arrays or whisper-style
//!   objects) and plain text into a [`Transcript`](burnsub_caption_model::Transcript)
//! - **Subtitle Generation:** SRT/VTT output from caption segments

pub mod import;
pub mod subtitles;

pub use import::*;
pub use subtitles::*;
