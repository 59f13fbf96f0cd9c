//! Output codec selection.
//!
//! Profiles are tried in preference order and the first one the local
//! ffmpeg build can produce wins.

use std::collections::HashSet;
use std::process::Command;

use burnsub_common::error::{BurnsubError, BurnsubResult};
use serde::Serialize;

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Container {
    WebM,
    Mp4,
}

impl Container {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Container::WebM => "webm",
            Container::Mp4 => "mp4",
        }
    }

    /// ffmpeg muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Container::WebM => "webm",
            Container::Mp4 => "mp4",
        }
    }
}

/// A container plus codec pair the encoder can be driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecProfile {
    /// MIME-style description, e.g. `video/webm;codecs=vp9,opus`.
    pub mime: &'static str,
    pub container: Container,
    /// ffmpeg video encoder; `None` leaves the muxer default.
    pub video_encoder: Option<&'static str>,
    /// ffmpeg audio encoder; `None` leaves the muxer default.
    pub audio_encoder: Option<&'static str>,
    /// MP4 must be fragmented to be written to a pipe.
    pub fragmented: bool,
}

/// Profiles in preference order.
pub const CODEC_PREFERENCES: [CodecProfile; 4] = [
    CodecProfile {
        mime: "video/webm;codecs=vp9,opus",
        container: Container::WebM,
        video_encoder: Some("libvpx-vp9"),
        audio_encoder: Some("libopus"),
        fragmented: false,
    },
    CodecProfile {
        mime: "video/mp4;codecs=avc1,mp4a",
        container: Container::Mp4,
        video_encoder: Some("libx264"),
        audio_encoder: Some("aac"),
        fragmented: true,
    },
    CodecProfile {
        mime: "video/webm;codecs=vp8,opus",
        container: Container::WebM,
        video_encoder: Some("libvpx"),
        audio_encoder: Some("libopus"),
        fragmented: false,
    },
    CodecProfile {
        mime: "video/webm",
        container: Container::WebM,
        video_encoder: None,
        audio_encoder: None,
        fragmented: false,
    },
];

/// Answers whether a profile can be produced in this environment.
pub trait CodecSupport {
    fn supports(&self, profile: &CodecProfile) -> bool;
}

/// Encoder and muxer lists reported by the local ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCapabilities {
    encoders: HashSet<String>,
    muxers: HashSet<String>,
}

impl FfmpegCapabilities {
    /// Query `ffmpeg -encoders` and `ffmpeg -muxers`.
    pub fn probe() -> BurnsubResult<Self> {
        let encoders = run_listing("-encoders")?;
        let muxers = run_listing("-muxers")?;
        let caps = Self::from_listings(&encoders, &muxers);
        tracing::debug!(
            encoders = caps.encoders.len(),
            muxers = caps.muxers.len(),
            "Probed ffmpeg capabilities"
        );
        Ok(caps)
    }

    /// Build from the raw text of the two listings.
    pub fn from_listings(encoders: &str, muxers: &str) -> Self {
        Self {
            encoders: parse_encoder_listing(encoders),
            muxers: parse_muxer_listing(muxers),
        }
    }

    pub fn has_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    pub fn has_muxer(&self, name: &str) -> bool {
        self.muxers.contains(name)
    }
}

impl CodecSupport for FfmpegCapabilities {
    fn supports(&self, profile: &CodecProfile) -> bool {
        self.has_muxer(profile.container.muxer())
            && profile.video_encoder.map_or(true, |e| self.has_encoder(e))
            && profile.audio_encoder.map_or(true, |e| self.has_encoder(e))
    }
}

fn run_listing(flag: &str) -> BurnsubResult<String> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", flag])
        .output()
        .map_err(|e| BurnsubError::unsupported(format!("Failed to run ffmpeg {flag}: {e}")))?;
    if !output.status.success() {
        return Err(BurnsubError::unsupported(format!(
            "ffmpeg {flag} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Encoder names follow the `------` separator as the second column.
fn parse_encoder_listing(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .skip_while(|line| line.trim() != "------")
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Muxer lines follow the `--` separator; the name column may hold a
/// comma-separated alias list.
fn parse_muxer_listing(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .skip_while(|line| line.trim() != "--")
        .skip(1)
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let flags = tokens.next()?;
            let names = tokens.next()?;
            flags.contains('E').then_some(names)
        })
        .flat_map(|names| names.split(','))
        .map(str::to_string)
        .collect()
}

/// First supported profile in preference order.
pub fn select_codec<C: CodecSupport + ?Sized>(support: &C) -> BurnsubResult<CodecProfile> {
    let profile = CODEC_PREFERENCES
        .iter()
        .find(|profile| support.supports(profile))
        .copied()
        .ok_or_else(|| {
            BurnsubError::unsupported("No supported container/codec combination for recording")
        })?;
    tracing::info!(
        mime = profile.mime,
        container = profile.container.extension(),
        "Selected output codec"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODERS: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
";

    const MUXERS: &str = "\
 File formats:
 D. = Demuxing supported
 .E = Muxing supported
 --
  E matroska        Matroska
  E mp4             MP4 (MPEG-4 Part 14)
  E webm            WebM
";

    #[test]
    fn test_parse_listings() {
        let caps = FfmpegCapabilities::from_listings(ENCODERS, MUXERS);
        assert!(caps.has_encoder("libx264"));
        assert!(caps.has_encoder("libopus"));
        assert!(!caps.has_encoder("libvpx-vp9"));
        assert!(!caps.has_encoder("Encoders:"));
        assert!(caps.has_muxer("webm"));
        assert!(caps.has_muxer("mp4"));
    }

    #[test]
    fn test_alias_muxer_names_are_split() {
        let muxers = " --\n DE mov,mp4,m4a  QuickTime / MOV\n D  h264  raw H.264\n";
        let caps = FfmpegCapabilities::from_listings("", muxers);
        assert!(caps.has_muxer("mp4"));
        assert!(caps.has_muxer("m4a"));
        assert!(!caps.has_muxer("h264"));
    }

    #[test]
    fn test_falls_through_to_h264_when_vp9_missing() {
        let caps = FfmpegCapabilities::from_listings(ENCODERS, MUXERS);
        let profile = select_codec(&caps).unwrap();
        assert_eq!(profile.container, Container::Mp4);
        assert!(profile.fragmented);
    }

    #[test]
    fn test_bare_webm_needs_only_the_muxer() {
        let caps = FfmpegCapabilities::from_listings("", " --\n  E webm  WebM\n");
        let profile = select_codec(&caps).unwrap();
        assert_eq!(profile.mime, "video/webm");
        assert_eq!(profile.video_encoder, None);
    }

    #[test]
    fn test_nothing_supported() {
        let caps = FfmpegCapabilities::default();
        let err = select_codec(&caps).unwrap_err();
        assert!(matches!(err, BurnsubError::UnsupportedEnvironment { .. }));
    }
}
