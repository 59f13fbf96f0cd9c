//! Transcript import.
//!
//! Accepts either a bare array of words or a transcription object:
//!
//! ```json
//! { "text": "...", "duration": 12.5,
//!   "words": [{ "word": "hi", "start": 0.0, "end": 0.3 }],
//!   "segments": [{ "words": [...] }] }
//! ```
//!
//! Word entries may name their text `text` or `word`. When an object has
//! no top-level `words`, the words of its `segments` are concatenated.

use std::path::Path;

use burnsub_caption_model::{join_word_texts, Transcript, Word};
use burnsub_common::error::{BurnsubError, BurnsubResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptJson {
    Words(Vec<Word>),
    Object(TranscriptObject),
}

#[derive(Debug, Deserialize)]
struct TranscriptObject {
    #[serde(default)]
    words: Option<Vec<Word>>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "duration_secs")]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<SegmentWords>,
}

#[derive(Debug, Deserialize)]
struct SegmentWords {
    #[serde(default)]
    words: Vec<Word>,
}

/// Parse word-timestamp JSON into a validated transcript.
pub fn parse_transcript_json(json: &str) -> BurnsubResult<Transcript> {
    let parsed: TranscriptJson = serde_json::from_str(json)
        .map_err(|e| BurnsubError::transcript(format!("Unrecognized transcript JSON: {e}")))?;

    let (words, text, duration) = match parsed {
        TranscriptJson::Words(words) => (words, None, None),
        TranscriptJson::Object(object) => {
            let words = match object.words {
                Some(words) if !words.is_empty() => words,
                _ => object
                    .segments
                    .into_iter()
                    .flat_map(|segment| segment.words)
                    .collect(),
            };
            (words, object.text, object.duration)
        }
    };

    let words = normalize_words(words)?;
    let text = text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| join_word_texts(&words));
    let last_end = words.iter().map(|w| w.end).fold(0.0, f64::max);
    let duration_secs = match duration {
        Some(d) if d.is_finite() && d >= 0.0 => d.max(last_end),
        Some(d) => {
            return Err(BurnsubError::transcript(format!(
                "Invalid transcript duration {d}"
            )))
        }
        None => last_end,
    };
    if words.is_empty() && duration.is_none() {
        tracing::warn!("Transcript has neither word timing nor a duration");
    }

    tracing::debug!(
        words = words.len(),
        duration_secs,
        has_text = !text.is_empty(),
        "Parsed transcript"
    );

    Ok(Transcript {
        words,
        text,
        duration_secs,
    })
}

/// Build a transcript with no word timing from plain text.
pub fn transcript_from_plain_text(text: &str, duration_secs: f64) -> BurnsubResult<Transcript> {
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(BurnsubError::transcript(format!(
            "Invalid transcript duration {duration_secs}"
        )));
    }
    Ok(Transcript::from_text(text.trim(), duration_secs))
}

/// Load a transcript file.
///
/// `.json` files are parsed as word timestamps. Anything else is read as
/// plain text and needs `duration_secs`.
pub fn load_transcript(path: &Path, duration_secs: Option<f64>) -> BurnsubResult<Transcript> {
    if !path.exists() {
        return Err(BurnsubError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let mut transcript = if is_json {
        parse_transcript_json(&content)?
    } else {
        let duration = duration_secs.ok_or_else(|| {
            BurnsubError::transcript("Plain-text transcripts need a known duration")
        })?;
        transcript_from_plain_text(&content, duration)?
    };

    if let Some(duration) = duration_secs {
        if duration.is_finite() && duration >= 0.0 {
            transcript.duration_secs = duration;
        }
    }

    tracing::info!(
        path = %path.display(),
        words = transcript.words.len(),
        duration_secs = transcript.duration_secs,
        "Loaded transcript"
    );
    Ok(transcript)
}

/// Trim word texts, drop empty words, validate timing, and order by onset.
fn normalize_words(words: Vec<Word>) -> BurnsubResult<Vec<Word>> {
    let mut words: Vec<Word> = words
        .into_iter()
        .filter_map(|w| {
            let text = w.text.trim();
            (!text.is_empty()).then(|| Word::new(text, w.start, w.end))
        })
        .collect();

    for word in &words {
        word.validate()
            .map_err(|e| BurnsubError::transcript(e.to_string()))?;
    }
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_word_array() {
        let t = parse_transcript_json(
            r#"[{"text":"Hello","start":0.0,"end":0.4},{"word":" world ","start":0.5,"end":0.9}]"#,
        )
        .unwrap();
        assert_eq!(t.words.len(), 2);
        assert_eq!(t.words[1].text, "world");
        assert_eq!(t.text, "Hello world");
        assert!((t.duration_secs - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_object_with_segments_and_duration() {
        let t = parse_transcript_json(
            r#"{
                "text": " Hi there. ",
                "duration": 3.0,
                "segments": [
                    {"text": "Hi", "words": [{"word":"Hi","start":0.1,"end":0.3,"probability":0.9}]},
                    {"words": [{"word":"there.","start":0.4,"end":0.8}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(t.words.len(), 2);
        assert_eq!(t.text, "Hi there.");
        assert_eq!(t.duration_secs, 3.0);
    }

    #[test]
    fn test_text_only_object() {
        let t = parse_transcript_json(r#"{"text":"no timing here","duration":4.0}"#).unwrap();
        assert!(t.words.is_empty());
        assert_eq!(t.text, "no timing here");
        assert_eq!(t.duration_secs, 4.0);
    }

    #[test]
    fn test_empty_words_are_dropped_and_order_restored() {
        let t = parse_transcript_json(
            r#"[{"text":"b","start":1.0,"end":1.2},{"text":"  ","start":0.5,"end":0.6},{"text":"a","start":0.0,"end":0.2}]"#,
        )
        .unwrap();
        let texts: Vec<_> = t.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_timing_is_rejected() {
        let err =
            parse_transcript_json(r#"[{"text":"bad","start":2.0,"end":1.0}]"#).unwrap_err();
        assert!(matches!(err, BurnsubError::Transcript { .. }));

        let err = parse_transcript_json(r#"{"text":"x","duration":-1.0}"#).unwrap_err();
        assert!(matches!(err, BurnsubError::Transcript { .. }));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_transcript_json("42"),
            Err(BurnsubError::Transcript { .. })
        ));
    }

    #[test]
    fn test_plain_text_needs_valid_duration() {
        let t = transcript_from_plain_text("  hello  ", 2.0).unwrap();
        assert_eq!(t.text, "hello");
        assert!(transcript_from_plain_text("hello", f64::NAN).is_err());
    }

    #[test]
    fn test_known_duration_applies_to_untimed_transcripts() {
        let dir = std::env::temp_dir();
        let json = dir.join(format!("burnsub-import-{}.json", std::process::id()));
        let text = dir.join(format!("burnsub-import-{}.txt", std::process::id()));
        std::fs::write(&json, r#"{"text":"hello world this is a caption"}"#).unwrap();
        std::fs::write(&text, "hello world\n").unwrap();

        let from_json = load_transcript(&json, Some(12.5)).unwrap();
        let from_text = load_transcript(&text, Some(12.5)).unwrap();
        let without_duration = load_transcript(&text, None);
        std::fs::remove_file(&json).ok();
        std::fs::remove_file(&text).ok();

        assert_eq!(from_json.duration_secs, 12.5);
        assert_eq!(from_text.text, "hello world");
        assert_eq!(from_text.duration_secs, 12.5);
        assert!(without_duration.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_transcript(Path::new("/nonexistent/words.json"), None).unwrap_err();
        assert!(matches!(err, BurnsubError::FileNotFound { .. }));
    }
}
