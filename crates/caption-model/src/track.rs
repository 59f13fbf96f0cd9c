//! Editable, persisted caption track (`segments.json`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::{active_segment, Segment};

/// Current on-disk format version.
pub const TRACK_FORMAT_VERSION: &str = "1.0";

/// Ordered list of segments plus persistence metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Format version (semver).
    #[serde(default = "default_version")]
    pub version: String,

    /// Last edit timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Caption segments in display order.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

fn default_version() -> String {
    TRACK_FORMAT_VERSION.to_string()
}

impl Default for CaptionTrack {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CaptionTrack {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            version: default_version(),
            modified_at: None,
            segments,
        }
    }

    /// Load a track from JSON.
    ///
    /// Accepts either the full track object or a bare segment array. The
    /// loaded segments are re-validated before being returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CaptionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut track = Self::from_json(&json).map_err(|e| CaptionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        track.revalidate();
        Ok(track)
    }

    fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OnDisk {
            Track(CaptionTrack),
            Bare(Vec<Segment>),
        }

        Ok(match serde_json::from_str::<OnDisk>(json)? {
            OnDisk::Track(track) => track,
            OnDisk::Bare(segments) => Self::new(segments),
        })
    }

    /// Write the track as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CaptionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CaptionError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| CaptionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| CaptionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment displayed at time `t`, if any.
    pub fn active_at(&self, t: f64) -> Option<&Segment> {
        active_segment(&self.segments, t).map(|(_, segment)| segment)
    }

    /// Change a segment's display window.
    pub fn edit_timing(&mut self, index: usize, start: f64, end: f64) -> Result<(), CaptionError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(CaptionError::ValidationError {
                message: format!("invalid timing {start}..{end}"),
            });
        }
        if end < start {
            return Err(CaptionError::ValidationError {
                message: format!("end {end:.3} precedes start {start:.3}"),
            });
        }

        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(CaptionError::IndexOutOfRange { index, len })?;
        segment.start_time = start;
        segment.end_time = end;

        self.touch();
        self.revalidate();
        Ok(())
    }

    /// Replace a segment's text. Its word-level timing is discarded.
    pub fn edit_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), CaptionError> {
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(CaptionError::IndexOutOfRange { index, len })?;
        segment.set_text(text);

        self.touch();
        self.revalidate();
        Ok(())
    }

    /// Restore ordering invariants after an edit.
    ///
    /// Segments are sorted by start (stable), an end overrunning the next
    /// segment's start is clipped to it, and `end >= start` is enforced.
    pub fn revalidate(&mut self) {
        self.segments
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let starts: Vec<f64> = self.segments.iter().map(|s| s.start_time).collect();
        for (i, segment) in self.segments.iter_mut().enumerate() {
            if let Some(&next_start) = starts.get(i + 1) {
                if segment.end_time > next_start {
                    segment.end_time = next_start;
                }
            }
            if segment.end_time < segment.start_time {
                segment.end_time = segment.start_time;
            }
        }
    }

    fn touch(&mut self) {
        self.modified_at = Some(Utc::now());
    }
}

/// Errors raised by caption model I/O and edits.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid caption data: {message}")]
    ValidationError { message: String },

    #[error("Segment index {index} out of range (track has {len} segments)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::Word;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start_time: start,
            end_time: end,
            text: text.to_string(),
            words: None,
        }
    }

    fn track() -> CaptionTrack {
        CaptionTrack::new(vec![
            seg(0.0, 1.0, "alpha"),
            seg(1.5, 2.5, "beta"),
            seg(3.0, 4.0, "gamma"),
        ])
    }

    fn assert_ordered(track: &CaptionTrack) {
        for pair in track.segments.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
            assert!(pair[0].end_time <= pair[1].start_time);
        }
        for s in &track.segments {
            assert!(s.end_time >= s.start_time);
        }
    }

    #[test]
    fn test_edit_timing_clips_overlap() {
        let mut track = track();
        track.edit_timing(0, 0.0, 2.0).unwrap();
        assert!((track.segments[0].end_time - 1.5).abs() < 1e-9);
        assert!(track.modified_at.is_some());
        assert_ordered(&track);
    }

    #[test]
    fn test_edit_timing_resorts() {
        let mut track = track();
        track.edit_timing(2, 0.5, 0.8).unwrap();
        let texts: Vec<&str> = track.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "gamma", "beta"]);
        // alpha now overruns gamma's start
        assert!((track.segments[0].end_time - 0.5).abs() < 1e-9);
        assert_ordered(&track);
    }

    #[test]
    fn test_edit_timing_rejects_bad_input() {
        let mut track = track();
        assert!(matches!(
            track.edit_timing(0, 2.0, 1.0),
            Err(CaptionError::ValidationError { .. })
        ));
        assert!(matches!(
            track.edit_timing(9, 0.0, 1.0),
            Err(CaptionError::IndexOutOfRange { index: 9, len: 3 })
        ));
        assert!(track.edit_timing(0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_edit_text_drops_word_timing() {
        let mut track = CaptionTrack::new(vec![Segment::from_words(vec![
            Word::new("hello", 0.0, 0.4),
            Word::new("world", 0.5, 0.9),
        ])
        .unwrap()]);
        track.edit_text(0, "goodbye world").unwrap();
        assert_eq!(track.segments[0].text, "goodbye world");
        assert!(track.segments[0].words.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("burnsub-track-{}", std::process::id()));
        let path = dir.join("segments.json");

        let mut original = track();
        original.edit_text(1, "edited").unwrap();
        original.save(&path).unwrap();

        let loaded = CaptionTrack::load(&path).unwrap();
        assert_eq!(loaded.segments, original.segments);
        assert_eq!(loaded.version, TRACK_FORMAT_VERSION);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let track =
            CaptionTrack::from_json(r#"[{"startTime":0,"endTime":1,"text":"x"}]"#).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.active_at(0.5).map(|s| s.text.as_str()), Some("x"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CaptionTrack::load("/nonexistent/burnsub/segments.json").unwrap_err();
        assert!(matches!(err, CaptionError::IoError { .. }));
    }
}
