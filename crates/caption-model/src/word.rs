//! Word-level timestamps and transcript input.

use serde::{Deserialize, Serialize};

use crate::track::CaptionError;

/// A single recognized word with its onset and offset in seconds.
///
/// Produced by an external transcription step and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text as recognized (no surrounding whitespace).
    #[serde(alias = "word")]
    pub text: String,
    /// Onset in seconds.
    pub start: f64,
    /// Offset in seconds.
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check the timing invariant: finite, non-negative, `start <= end`.
    pub fn validate(&self) -> Result<(), CaptionError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(CaptionError::ValidationError {
                message: format!("word {:?} has non-finite timing", self.text),
            });
        }
        if self.start < 0.0 || self.start > self.end {
            return Err(CaptionError::ValidationError {
                message: format!(
                    "word {:?} has invalid span {:.3}..{:.3}",
                    self.text, self.start, self.end
                ),
            });
        }
        Ok(())
    }
}

/// Segmenter input: the word stream plus the plain-text fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Ordered word timestamps (may be empty).
    #[serde(default)]
    pub words: Vec<Word>,

    /// Plain transcript text, used when no word timing is available.
    #[serde(default)]
    pub text: String,

    /// Estimated audio duration in seconds.
    #[serde(default)]
    pub duration_secs: f64,
}

impl Transcript {
    pub fn from_words(words: Vec<Word>) -> Self {
        let duration_secs = words.iter().map(|w| w.end).fold(0.0, f64::max);
        let text = join_word_texts(&words);
        Self {
            words,
            text,
            duration_secs,
        }
    }

    pub fn from_text(text: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            words: Vec::new(),
            text: text.into(),
            duration_secs,
        }
    }

    /// Whether nothing at all can be captioned.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.text.trim().is_empty()
    }

    /// Validate every word.
    pub fn validate(&self) -> Result<(), CaptionError> {
        self.words.iter().try_for_each(Word::validate)
    }
}

/// Join word texts with single spaces.
pub fn join_word_texts(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
