//! Highlight resolution: which words of a segment are "spoken" at time `t`.
//!
//! Word-timed segments reveal a word at its onset. Segments without word
//! timing spread the reveal linearly across their display window.

use burnsub_caption_model::Segment;
use serde::Serialize;

/// Per-word reveal state for one segment at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightState {
    /// Index of the last revealed word, `None` when nothing is revealed yet.
    pub revealed: Option<usize>,

    /// Number of displayable words in the segment.
    pub word_count: usize,
}

impl HighlightState {
    pub fn none(word_count: usize) -> Self {
        Self {
            revealed: None,
            word_count,
        }
    }

    /// Revealed index with `-1` meaning "none".
    pub fn revealed_index(&self) -> isize {
        self.revealed.map_or(-1, |i| i as isize)
    }

    /// Whether word `index` is drawn in the highlight colour.
    pub fn is_revealed(&self, index: usize) -> bool {
        self.revealed.is_some_and(|last| index <= last)
    }
}

/// Resolve the highlight state of `segment` at playback time `t` (seconds).
pub fn resolve_highlight(segment: &Segment, t: f64) -> HighlightState {
    match &segment.words {
        Some(words) if !words.is_empty() => {
            let onsets = words.iter().filter(|w| w.start <= t).count();
            HighlightState {
                revealed: onsets.checked_sub(1),
                word_count: words.len(),
            }
        }
        _ => {
            let word_count = segment.word_count();
            if word_count == 0 {
                return HighlightState::none(0);
            }

            let span = segment.end_time - segment.start_time;
            let progress = if span <= 0.0 {
                1.0
            } else {
                ((t - segment.start_time) / span).clamp(0.0, 1.0)
            };

            let index = ((progress * word_count as f64).floor() as usize).min(word_count - 1);
            HighlightState {
                revealed: Some(index),
                word_count,
            }
        }
    }
}
