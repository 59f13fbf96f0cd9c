//! Live preview overlay.
//!
//! Produces positioned caption spans for an on-screen player using the same
//! highlight resolution and layout as export, so preview and burned-in
//! output agree on which words are lit at any instant. The overlay goes
//! quiet while an export session holds the [`SessionLock`].

use burnsub_caption_model::{active_segment_within, Segment};
use burnsub_common::clock::FrameClock;
use burnsub_common::lock::SessionLock;
use serde::Serialize;

use crate::font::TextMeasure;
use crate::highlight::resolve_highlight;
use crate::layout::{layout_caption, RenderStyle};

/// One word as placed on the preview surface (final canvas coordinates).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySpan {
    pub word: String,
    /// Left end of the baseline.
    pub left: f32,
    pub baseline: f32,
    pub width: f32,
    pub font_size_px: f32,
    pub stroke_width_px: f32,
    /// `#rrggbb`
    pub color: String,
    pub revealed: bool,
}

/// Caption overlay state for one playback instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySnapshot {
    pub time_secs: f64,
    pub segment_index: usize,
    pub revealed_index: isize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub spans: Vec<OverlaySpan>,
}

impl OverlaySnapshot {
    /// Render as an absolutely positioned HTML fragment.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div class=\"burnsub-overlay\" style=\"position:relative;width:{}px;height:{}px\">\n",
            self.canvas_width, self.canvas_height
        );
        for span in &self.spans {
            html.push_str(&format!(
                "  <span style=\"position:absolute;left:{:.1}px;top:{:.1}px;font-size:{:.1}px;\
                 font-weight:900;font-family:sans-serif;line-height:1;color:{};\
                 -webkit-text-stroke:{:.1}px #000000;paint-order:stroke fill\">{}</span>\n",
                span.left,
                span.baseline - span.font_size_px,
                span.font_size_px,
                span.color,
                span.stroke_width_px,
                escape_html(&span.word),
            ));
        }
        html.push_str("</div>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Preview adapter bound to the workspace session lock.
#[derive(Debug, Clone)]
pub struct PreviewOverlay {
    lock: SessionLock,
    style: RenderStyle,
    min_display_secs: f64,
}

impl PreviewOverlay {
    pub fn new(lock: SessionLock, style: RenderStyle, fps: u32) -> Self {
        Self {
            lock,
            style,
            min_display_secs: FrameClock::new(fps).frame_duration_secs(),
        }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Overlay state at playback time `t`.
    ///
    /// `None` when no segment is active or while an export is running.
    pub fn snapshot<M: TextMeasure + ?Sized>(
        &self,
        segments: &[Segment],
        t: f64,
        canvas: (u32, u32),
        measure: &M,
    ) -> Option<OverlaySnapshot> {
        if self.lock.is_active() {
            tracing::trace!("Preview overlay suppressed during export");
            return None;
        }

        let (index, segment) = active_segment_within(segments, t, self.min_display_secs)?;
        let highlight = resolve_highlight(segment, t);
        let words = segment.word_texts();
        let layout = layout_caption(
            &words,
            &highlight,
            canvas.0 as f32,
            canvas.1 as f32,
            &self.style,
            measure,
        );

        let spans = layout
            .instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| {
                let (left, baseline) =
                    layout.to_canvas(instruction.origin_x(), instruction.baseline_y);
                OverlaySpan {
                    word: instruction.word.clone(),
                    left,
                    baseline,
                    width: instruction.width * layout.scale,
                    font_size_px: layout.font_size_px * layout.scale,
                    stroke_width_px: instruction.stroke_width_px * layout.scale,
                    color: instruction.fill.to_hex(),
                    revealed: highlight.is_revealed(i),
                }
            })
            .collect();

        Some(OverlaySnapshot {
            time_secs: t,
            segment_index: index,
            revealed_index: highlight.revealed_index(),
            canvas_width: canvas.0,
            canvas_height: canvas.1,
            spans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BlockTypeface;
    use crate::layout::HIGHLIGHT_COLOR;
    use burnsub_caption_model::Word;

    fn segments() -> Vec<Segment> {
        vec![
            Segment::from_words(vec![Word::new("fish", 0.0, 0.4), Word::new("&", 0.5, 0.6)])
                .unwrap(),
            Segment::fallback("chips", 1.0),
        ]
    }

    #[test]
    fn test_snapshot_matches_highlight() {
        let overlay = PreviewOverlay::new(SessionLock::new(), RenderStyle::new(24.0), 60);
        let snapshot = overlay
            .snapshot(&segments(), 0.2, (360, 640), &BlockTypeface::default())
            .unwrap();

        assert_eq!(snapshot.segment_index, 0);
        assert_eq!(snapshot.revealed_index, 0);
        assert_eq!(snapshot.spans.len(), 2);
        assert_eq!(snapshot.spans[0].color, HIGHLIGHT_COLOR.to_hex());
        assert!(snapshot.spans[0].revealed);
        assert!(!snapshot.spans[1].revealed);
        assert!(snapshot.spans[0].left < snapshot.spans[1].left);
    }

    #[test]
    fn test_snapshot_suppressed_while_exporting() {
        let lock = SessionLock::new();
        let overlay = PreviewOverlay::new(lock.clone(), RenderStyle::default(), 60);
        let guard = lock.try_acquire().unwrap();
        assert!(overlay
            .snapshot(&segments(), 0.2, (360, 640), &BlockTypeface::default())
            .is_none());
        drop(guard);
        assert!(overlay
            .snapshot(&segments(), 0.2, (360, 640), &BlockTypeface::default())
            .is_some());
    }

    #[test]
    fn test_no_snapshot_between_segments() {
        let overlay = PreviewOverlay::new(SessionLock::new(), RenderStyle::default(), 60);
        let segments = vec![Segment {
            start_time: 2.0,
            end_time: 3.0,
            text: "late".to_string(),
            words: None,
        }];
        assert!(overlay
            .snapshot(&segments, 1.0, (360, 640), &BlockTypeface::default())
            .is_none());
    }

    #[test]
    fn test_html_escapes_words() {
        let overlay = PreviewOverlay::new(SessionLock::new(), RenderStyle::default(), 60);
        let html = overlay
            .snapshot(&segments(), 0.55, (360, 640), &BlockTypeface::default())
            .unwrap()
            .to_html();
        assert!(html.contains("&amp;"));
        assert!(html.contains("fish"));
        assert!(html.starts_with("<div"));
    }
}
