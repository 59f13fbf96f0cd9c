//! Subtitle generation in SRT and VTT formats.

use std::fmt::Write;
use std::path::Path;

use burnsub_caption_model::Segment;
use burnsub_common::error::BurnsubResult;

/// Subtitle file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    /// Pick the format from a file extension, defaulting to SRT.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("vtt") => SubtitleFormat::Vtt,
            _ => SubtitleFormat::Srt,
        }
    }

    pub fn render(self, segments: &[Segment]) -> String {
        match self {
            SubtitleFormat::Srt => generate_srt(segments),
            SubtitleFormat::Vtt => generate_vtt(segments),
        }
    }
}

/// Generate SRT subtitle content from caption segments.
pub fn generate_srt(segments: &[Segment]) -> String {
    let mut output = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let _ = write!(
            output,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start_time, ','),
            format_timestamp(segment.end_time, ','),
            segment.text.trim(),
        );
    }
    output
}

/// Generate WebVTT subtitle content from caption segments.
///
/// Segments with word timing carry inline `<hh:mm:ss.mmm>` cue timestamps
/// so players that support them can highlight word by word.
pub fn generate_vtt(segments: &[Segment]) -> String {
    let mut output = String::from("WEBVTT\n\n");
    for segment in segments {
        let _ = writeln!(
            output,
            "{} --> {}",
            format_timestamp(segment.start_time, '.'),
            format_timestamp(segment.end_time, '.'),
        );
        output.push_str(&vtt_cue_text(segment));
        output.push_str("\n\n");
    }
    output
}

fn vtt_cue_text(segment: &Segment) -> String {
    match segment.words.as_deref() {
        Some(words) if segment.has_word_timing() => {
            let mut cue = String::new();
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    cue.push(' ');
                    if word.start > segment.start_time {
                        let _ = write!(cue, "<{}>", format_timestamp(word.start, '.'));
                    }
                }
                cue.push_str(&escape_vtt(&word.text));
            }
            cue
        }
        _ => escape_vtt(segment.text.trim()),
    }
}

fn escape_vtt(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `HH:MM:SS<sep>mmm`, rounded to the nearest millisecond.
fn format_timestamp(secs: f64, separator: char) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}

/// Save subtitles to a file, choosing the format from its extension.
pub fn save_subtitles(segments: &[Segment], path: &Path) -> BurnsubResult<()> {
    let format = SubtitleFormat::from_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format.render(segments))?;
    tracing::info!(
        path = %path.display(),
        format = ?format,
        cues = segments.len(),
        "Wrote subtitles"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burnsub_caption_model::Word;

    fn timed() -> Segment {
        Segment::from_words(vec![
            Word::new("Hello", 0.0, 0.4),
            Word::new("world", 0.5, 2.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_srt_generation() {
        let segments = vec![timed(), Segment::fallback("This is a test", 5.0)];
        let srt = generate_srt(&segments);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world"));
        assert!(srt.contains("2\n00:00:00,000 --> 00:00:05,000\nThis is a test"));
    }

    #[test]
    fn test_vtt_inline_word_timestamps() {
        let vtt = generate_vtt(&[timed()]);
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500\nHello <00:00:00.500>world"));
    }

    #[test]
    fn test_vtt_escapes_markup() {
        let vtt = generate_vtt(&[Segment::fallback("a <b> & c", 1.0)]);
        assert!(vtt.contains("a &lt;b&gt; &amp; c"));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(format_timestamp(3661.5, ','), "01:01:01,500");
        assert_eq!(format_timestamp(3661.5, '.'), "01:01:01.500");
        assert_eq!(format_timestamp(1.9999, '.'), "00:00:02.000");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SubtitleFormat::from_path(Path::new("a.VTT")), SubtitleFormat::Vtt);
        assert_eq!(SubtitleFormat::from_path(Path::new("a.srt")), SubtitleFormat::Srt);
        assert_eq!(SubtitleFormat::from_path(Path::new("a")), SubtitleFormat::Srt);
    }
}
