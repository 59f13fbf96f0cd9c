//! Segmentation: grouping word timestamps into display segments.
//!
//! # Algorithm
//!
//! 1. Open a segment at the first unassigned word.
//! 2. Append words one at a time.
//! 3. **Close** the segment when it reaches `max_words`, or when the silence
//!    between the word just appended and the next one exceeds
//!    `pause_threshold_secs`.
//! 4. A trailing partial group becomes the final segment.
//!
//! Transcripts without word timing collapse into a single whole-clip
//! fallback segment.

use burnsub_caption_model::{Segment, Transcript, Word};
use burnsub_common::SegmentationDefaults;

/// Configuration for the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Maximum words per segment. Zero is treated as one.
    pub max_words: usize,

    /// Silence (seconds) between two words that forces a segment break.
    /// Strictly greater-than: a gap equal to the threshold does not split.
    pub pause_threshold_secs: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_words: 5,
            pause_threshold_secs: 0.8,
        }
    }
}

impl From<&SegmentationDefaults> for SegmenterConfig {
    fn from(defaults: &SegmentationDefaults) -> Self {
        Self {
            max_words: defaults.max_words,
            pause_threshold_secs: defaults.pause_threshold_secs,
        }
    }
}

/// Pure, deterministic word-to-segment grouping.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Create a segmenter with default limits (5 words, 0.8s pause).
    pub fn with_defaults() -> Self {
        Self::new(SegmenterConfig::default())
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Group an ordered word stream into segments.
    ///
    /// Every input word lands in exactly one segment, in input order.
    pub fn segment(&self, words: &[Word]) -> Vec<Segment> {
        let max_words = self.config.max_words.max(1);
        let mut segments = Vec::new();
        let mut current: Vec<Word> = Vec::with_capacity(max_words);

        for (i, word) in words.iter().enumerate() {
            current.push(word.clone());

            let full = current.len() >= max_words;
            let paused = words
                .get(i + 1)
                .is_some_and(|next| next.start - word.end > self.config.pause_threshold_secs);

            if full || paused {
                segments.extend(Segment::from_words(std::mem::take(&mut current)));
            }
        }

        segments.extend(Segment::from_words(current));
        segments
    }

    /// Segment a transcript, falling back to one whole-clip segment when it
    /// carries text but no word timing.
    ///
    /// Returns an empty list when there is nothing to caption.
    pub fn segment_transcript(&self, transcript: &Transcript) -> Vec<Segment> {
        if !transcript.words.is_empty() {
            let segments = self.segment(&transcript.words);
            tracing::debug!(
                words = transcript.words.len(),
                segments = segments.len(),
                "Segmented word-timed transcript"
            );
            return segments;
        }

        let text = transcript.text.trim();
        if text.is_empty() {
            tracing::debug!("Transcript is empty; no segments");
            return Vec::new();
        }

        tracing::debug!(
            duration_secs = transcript.duration_secs,
            "Transcript has no word timing; using fallback segment"
        );
        vec![Segment::fallback(text, transcript.duration_secs)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn w(text: &str, start: f64, end: f64) -> Word {
        Word::new(text, start, end)
    }

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_empty_words() {
        assert!(Segmenter::with_defaults().segment(&[]).is_empty());
    }

    #[test]
    fn test_pause_splits_segment() {
        let words = vec![
            w("A", 0.0, 0.5),
            w("B", 0.6, 1.0),
            w("C", 2.0, 2.5),
            w("D", 2.6, 3.0),
        ];
        let segments = Segmenter::with_defaults().segment(&words);

        assert_eq!(texts(&segments), vec!["A B", "C D"]);
        assert!((segments[0].start_time - 0.0).abs() < 1e-9);
        assert!((segments[0].end_time - 1.0).abs() < 1e-9);
        assert!((segments[1].start_time - 2.0).abs() < 1e-9);
        assert!((segments[1].end_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_pause_after_second_word() {
        let words = vec![w("a", 0.0, 1.0), w("b", 1.0, 1.2), w("c", 2.5, 2.8)];
        let segments = Segmenter::with_defaults().segment(&words);

        assert_eq!(texts(&segments), vec!["a b", "c"]);
        assert_eq!(segments[0].start_time, 0.0);
        assert!((segments[0].end_time - 1.2).abs() < 1e-9);
        assert_eq!(segments[1].start_time, 2.5);
        assert_eq!(segments[1].end_time, 2.8);
    }

    #[test]
    fn test_exactly_max_words_back_to_back() {
        let words: Vec<Word> = (0..5)
            .map(|i| w(&format!("w{i}"), i as f64 * 0.25, (i + 1) as f64 * 0.25))
            .collect();
        let segments = Segmenter::with_defaults().segment(&words);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].word_count(), 5);
        assert_eq!(segments[0].text, "w0 w1 w2 w3 w4");
        assert_eq!(segments[0].end_time, 1.25);
    }

    #[test]
    fn test_max_words_splits_segment() {
        let words: Vec<Word> = (0..7)
            .map(|i| w(&format!("w{i}"), i as f64 * 0.3, i as f64 * 0.3 + 0.2))
            .collect();
        let segments = Segmenter::with_defaults().segment(&words);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].word_count(), 5);
        assert_eq!(segments[1].word_count(), 2);
        assert_eq!(segments[1].text, "w5 w6");
    }

    #[test]
    fn test_gap_equal_to_threshold_does_not_split() {
        let words = vec![w("a", 0.0, 1.0), w("b", 1.8, 2.0)];
        let segments = Segmenter::with_defaults().segment(&words);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_zero_max_words_behaves_as_one() {
        let segmenter = Segmenter::new(SegmenterConfig {
            max_words: 0,
            pause_threshold_secs: 0.8,
        });
        let words = vec![w("a", 0.0, 0.1), w("b", 0.2, 0.3)];
        assert_eq!(texts(&segmenter.segment(&words)), vec!["a", "b"]);
    }

    #[test]
    fn test_overlapping_words_are_tolerated() {
        let words = vec![w("a", 0.0, 1.0), w("b", 0.5, 0.9), w("c", 0.95, 1.2)];
        let segments = Segmenter::with_defaults().segment(&words);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].end_time - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_transcript_fallback_segment() {
        let transcript = Transcript::from_text("hello world this is a test", 14.0);
        let segments = Segmenter::with_defaults().segment_transcript(&transcript);

        assert_eq!(segments.len(), 1);
        assert!((segments[0].start_time - 0.0).abs() < 1e-9);
        assert!((segments[0].end_time - 14.0).abs() < 1e-9);
        assert_eq!(segments[0].text, "hello world this is a test");
        assert!(segments[0].words.is_none());
    }

    #[test]
    fn test_blank_transcript_yields_nothing() {
        let transcript = Transcript::from_text("  \n ", 5.0);
        assert!(Segmenter::with_defaults()
            .segment_transcript(&transcript)
            .is_empty());
    }

    #[test]
    fn test_config_from_defaults() {
        let defaults = SegmentationDefaults {
            max_words: 3,
            pause_threshold_secs: 0.5,
        };
        let config = SegmenterConfig::from(&defaults);
        assert_eq!(config.max_words, 3);
        assert!((config.pause_threshold_secs - 0.5).abs() < 1e-9);
    }

    fn word_stream() -> impl Strategy<Value = Vec<Word>> {
        prop::collection::vec((0.0f64..2.0, 0.0f64..1.5), 0..60).prop_map(|steps| {
            let mut t = 0.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (gap, len))| {
                    let start = t + gap;
                    let end = start + len;
                    t = end;
                    Word::new(format!("w{i}"), start, end)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_every_word_lands_in_exactly_one_segment(
            words in word_stream(),
            max_words in 1usize..8,
            pause in 0.1f64..1.5,
        ) {
            let segmenter = Segmenter::new(SegmenterConfig { max_words, pause_threshold_secs: pause });
            let segments = segmenter.segment(&words);

            let flattened: Vec<Word> = segments
                .iter()
                .flat_map(|s| s.words.clone().unwrap_or_default())
                .collect();
            prop_assert_eq!(&flattened, &words);

            for segment in &segments {
                let seg_words = segment.words.as_ref().unwrap();
                prop_assert!(!seg_words.is_empty());
                prop_assert!(seg_words.len() <= max_words);
                prop_assert_eq!(segment.start_time, seg_words[0].start);
                prop_assert_eq!(segment.end_time, seg_words[seg_words.len() - 1].end);
                for pair in seg_words.windows(2) {
                    prop_assert!(pair[1].start - pair[0].end <= pause);
                }
            }
        }

        #[test]
        fn prop_segmentation_is_deterministic(words in word_stream()) {
            let segmenter = Segmenter::with_defaults();
            prop_assert_eq!(segmenter.segment(&words), segmenter.segment(&words));
        }
    }
}
