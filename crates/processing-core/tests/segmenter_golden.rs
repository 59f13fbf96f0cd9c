use std::path::PathBuf;

use burnsub_caption_model::Transcript;
use burnsub_processing_core::{Segmenter, SegmenterConfig};

fn load_fixture_transcript() -> Transcript {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-transcript.json");

    let content = std::fs::read_to_string(path).expect("fixture transcript should be readable");
    serde_json::from_str(&content).expect("fixture transcript should parse")
}

#[test]
fn default_segmentation_of_fixture_is_stable() {
    let transcript = load_fixture_transcript();
    let segments = Segmenter::with_defaults().segment_transcript(&transcript);

    let signature = segments
        .iter()
        .map(|s| format!("{:.2}|{:.2}|{}", s.start_time, s.end_time, s.text))
        .collect::<Vec<_>>();

    assert_eq!(
        signature,
        vec![
            "0.00|1.62|Welcome back to the channel",
            "1.70|2.98|today we are building",
            "4.10|6.15|a karaoke caption renderer in",
            "6.20|6.70|Rust",
        ]
    );
}

#[test]
fn fixture_words_are_fully_covered() {
    let transcript = load_fixture_transcript();
    let segments = Segmenter::new(SegmenterConfig {
        max_words: 3,
        pause_threshold_secs: 0.5,
    })
    .segment_transcript(&transcript);

    let total: usize = segments.iter().map(|s| s.word_count()).sum();
    assert_eq!(total, transcript.words.len());
    assert!(segments.iter().all(|s| s.word_count() <= 3));
    assert!(segments
        .windows(2)
        .all(|pair| pair[0].end_time <= pair[1].start_time));
}

#[test]
fn fixture_without_word_timing_falls_back_to_full_clip() {
    let mut transcript = load_fixture_transcript();
    transcript.words.clear();

    let segments = Segmenter::with_defaults().segment_transcript(&transcript);
    assert_eq!(segments.len(), 1);
    assert!((segments[0].end_time - 7.0).abs() < 1e-9);
    assert!(segments[0].words.is_none());
}
