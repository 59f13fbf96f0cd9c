//! Caption segments and active-segment selection.

use serde::{Deserialize, Serialize};

use crate::word::{join_word_texts, Word};

/// A displayable caption unit.
///
/// When `words` is present, `start_time`/`end_time` mirror the first word's
/// start and the last word's end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Display start (seconds).
    #[serde(alias = "startTime")]
    pub start_time: f64,

    /// Display end (seconds).
    #[serde(alias = "endTime")]
    pub end_time: f64,

    /// Caption text.
    pub text: String,

    /// Per-word timing, absent for fallback or manually edited segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl Segment {
    /// Build a segment spanning a non-empty group of words.
    ///
    /// Returns `None` for an empty group.
    pub fn from_words(words: Vec<Word>) -> Option<Self> {
        let start_time = words.first()?.start;
        let end_time = words.last()?.end;
        Some(Self {
            start_time,
            end_time,
            text: join_word_texts(&words),
            words: Some(words),
        })
    }

    /// Whole-clip segment used when only plain text is available.
    pub fn fallback(text: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            start_time: 0.0,
            end_time: duration_secs.max(0.0),
            text: text.into(),
            words: None,
        }
    }

    /// Whether word-level timing is attached.
    pub fn has_word_timing(&self) -> bool {
        self.words.as_ref().is_some_and(|w| !w.is_empty())
    }

    /// Display duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Word texts in display order.
    pub fn word_texts(&self) -> Vec<&str> {
        match &self.words {
            Some(words) if !words.is_empty() => words.iter().map(|w| w.text.as_str()).collect(),
            _ => self.text.split_whitespace().collect(),
        }
    }

    /// Number of displayable words.
    pub fn word_count(&self) -> usize {
        match &self.words {
            Some(words) if !words.is_empty() => words.len(),
            _ => self.text.split_whitespace().count(),
        }
    }

    /// Containment test used for active-segment selection.
    ///
    /// A segment shorter than `min_display_secs` (including the single-instant
    /// case) is treated as lasting `min_display_secs` from its start so it
    /// still covers at least one output frame.
    pub fn is_active_at(&self, t: f64, min_display_secs: f64) -> bool {
        let end = self.end_time.max(self.start_time + min_display_secs);
        if self.end_time < self.start_time + min_display_secs {
            self.start_time <= t && t < end
        } else {
            self.start_time <= t && t <= end
        }
    }

    /// Replace the caption text. Word-level timing no longer matches and is dropped.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.words = None;
    }
}

/// First segment containing `t` (inclusive bounds).
pub fn active_segment(segments: &[Segment], t: f64) -> Option<(usize, &Segment)> {
    active_segment_within(segments, t, 0.0)
}

/// First segment containing `t`, with degenerate segments widened to
/// `min_display_secs`.
pub fn active_segment_within(
    segments: &[Segment],
    t: f64,
    min_display_secs: f64,
) -> Option<(usize, &Segment)> {
    segments
        .iter()
        .enumerate()
        .find(|(_, segment)| segment.is_active_at(t, min_display_secs))
}
