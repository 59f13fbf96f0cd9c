//! Source media probing through `ffprobe`.

use std::path::Path;
use std::process::Command;

use burnsub_common::error::{BurnsubError, BurnsubResult};

/// What the export needs to know about a source video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Even-rounded frame width.
    pub width: u32,
    /// Even-rounded frame height.
    pub height: u32,
    pub duration_secs: f64,
    pub has_audio: bool,
}

/// Probe dimensions, duration and audio presence of `path`.
pub fn probe_media(path: &Path) -> BurnsubResult<MediaInfo> {
    if !path.exists() {
        return Err(BurnsubError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let (width, height) = probe_video_dimensions(path).ok_or_else(|| {
        BurnsubError::render(format!("No video stream found in {}", path.display()))
    })?;
    let (width, height) = even_dimensions(width, height);

    let duration_secs = probe_duration_secs(path)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| {
            BurnsubError::render(format!("Could not determine duration of {}", path.display()))
        })?;

    let has_audio = probe_has_audio(path);

    tracing::info!(
        path = %path.display(),
        width,
        height,
        duration_secs,
        has_audio,
        "Probed source media"
    );

    Ok(MediaInfo {
        width,
        height,
        duration_secs,
        has_audio,
    })
}

/// Round down to even sizes (yuv420p needs both even), never below 2.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    ((width & !1).max(2), (height & !1).max(2))
}

pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn ffprobe(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(args)
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

pub fn probe_video_dimensions(path: &Path) -> Option<(u32, u32)> {
    let raw = ffprobe(
        path,
        &[
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ],
    )?;
    parse_dimensions(&raw)
}

pub fn probe_duration_secs(path: &Path) -> Option<f64> {
    let raw = ffprobe(
        path,
        &[
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
    )?;
    raw.lines().next()?.trim().parse::<f64>().ok()
}

pub fn probe_has_audio(path: &Path) -> bool {
    ffprobe(
        path,
        &[
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ],
    )
    .is_some_and(|raw| raw.lines().any(|line| !line.trim().is_empty()))
}

fn parse_dimensions(raw: &str) -> Option<(u32, u32)> {
    let line = raw.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let width = w.trim().parse::<u32>().ok()?;
    let height = h.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}
