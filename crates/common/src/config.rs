//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Caption style defaults.
    #[serde(default)]
    pub style: StyleDefaults,

    /// Segmentation parameters.
    #[serde(default)]
    pub segmentation: SegmentationDefaults,

    /// Burn-in export parameters.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Caption style defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDefaults {
    /// Caption font size at the 360px reference width.
    pub font_size_px: f32,

    /// Font file to use instead of the system sans-serif face.
    pub font_path: Option<PathBuf>,
}

/// Segmentation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationDefaults {
    /// Maximum words per caption segment.
    pub max_words: usize,

    /// Gap between words (seconds) that forces a segment break.
    pub pause_threshold_secs: f64,
}

/// Export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Capture frame rate.
    pub fps: u32,

    /// Target video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Target audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Upper bound for the seek-to-start wait.
    pub seek_timeout_ms: u64,

    /// Upper bound for the font readiness wait.
    pub font_timeout_ms: u64,

    /// Directory where artifacts are written.
    pub output_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "burnsub=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font_size_px: 24.0,
            font_path: None,
        }
    }
}

impl Default for SegmentationDefaults {
    fn default() -> Self {
        Self {
            max_words: 5,
            pause_threshold_secs: 0.8,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 60,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            seek_timeout_ms: 5000,
            font_timeout_ms: 5000,
            output_dir: default_output_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("burnsub").join("config.json")
}

/// Default artifact directory.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_VIDEOS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Videos")
        });
    base.join("burnsub")
}
