//! Frame compositor: source frame plus the karaoke caption overlay.
//!
//! Each output frame is drawn in two passes onto a single RGBA canvas:
//! the decoded source frame stretched to the canvas, then the active
//! caption line (outline first, fill second) under the layout's pivot
//! downscale.

use burnsub_caption_model::{active_segment_within, Segment};
use burnsub_common::clock::FrameClock;
use burnsub_common::error::{BurnsubError, BurnsubResult};
use serde::Serialize;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, LineJoin, Paint, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::font::Typeface;
use crate::highlight::resolve_highlight;
use crate::layout::{layout_caption, CaptionLayout, DrawInstruction, RenderStyle};

/// A decoded RGBA source frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows (`width * height * 4` bytes), opaque.
    pub data: Vec<u8>,
    /// Presentation time on the source timeline (seconds).
    pub pts_secs: f64,
}

impl VideoFrame {
    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], pts_secs: f64) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
            pts_secs,
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Draws composited frames onto an owned canvas.
pub struct FrameCompositor<F: Typeface> {
    canvas: Pixmap,
    style: RenderStyle,
    typeface: F,
    min_display_secs: f64,
}

impl<F: Typeface> FrameCompositor<F> {
    /// Create a compositor with a `width` x `height` canvas.
    ///
    /// `fps` sets the minimum on-screen time of degenerate segments.
    pub fn new(
        width: u32,
        height: u32,
        style: RenderStyle,
        typeface: F,
        fps: u32,
    ) -> BurnsubResult<Self> {
        let canvas = Pixmap::new(width, height).ok_or_else(|| {
            BurnsubError::render(format!("Invalid canvas size {width}x{height}"))
        })?;
        Ok(Self {
            canvas,
            style,
            typeface,
            min_display_secs: FrameClock::new(fps).frame_duration_secs(),
        })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Canvas pixels as packed RGBA8 (premultiplied; opaque in practice).
    pub fn frame_bytes(&self) -> &[u8] {
        self.canvas.data()
    }

    pub fn typeface(&self) -> &F {
        &self.typeface
    }

    /// Draw one output frame for playback time `t`.
    ///
    /// Returns the caption layout that was drawn, or `None` when no segment
    /// is active and the canvas holds the source frame only.
    pub fn compose(
        &mut self,
        frame: &VideoFrame,
        segments: &[Segment],
        t: f64,
    ) -> BurnsubResult<Option<CaptionLayout>> {
        self.draw_source(frame)?;

        let Some((_, segment)) = active_segment_within(segments, t, self.min_display_secs) else {
            return Ok(None);
        };

        let highlight = resolve_highlight(segment, t);
        let words = segment.word_texts();
        let layout = layout_caption(
            &words,
            &highlight,
            self.canvas.width() as f32,
            self.canvas.height() as f32,
            &self.style,
            &self.typeface,
        );

        for instruction in &layout.instructions {
            self.draw_word(&layout, instruction);
        }
        Ok(Some(layout))
    }

    fn draw_source(&mut self, frame: &VideoFrame) -> BurnsubResult<()> {
        if frame.data.len() != frame.expected_len() {
            return Err(BurnsubError::render(format!(
                "Frame buffer holds {} bytes, expected {} for {}x{}",
                frame.data.len(),
                frame.expected_len(),
                frame.width,
                frame.height
            )));
        }

        if frame.width == self.canvas.width() && frame.height == self.canvas.height() {
            self.canvas.data_mut().copy_from_slice(&frame.data);
            return Ok(());
        }

        let size = IntSize::from_wh(frame.width, frame.height).ok_or_else(|| {
            BurnsubError::render(format!("Invalid frame size {}x{}", frame.width, frame.height))
        })?;
        let source = Pixmap::from_vec(frame.data.clone(), size)
            .ok_or_else(|| BurnsubError::render("Frame buffer rejected by rasterizer"))?;

        let sx = self.canvas.width() as f32 / frame.width as f32;
        let sy = self.canvas.height() as f32 / frame.height as f32;
        self.canvas.fill(tiny_skia::Color::BLACK);
        self.canvas.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            },
            Transform::from_scale(sx, sy),
            None,
        );
        Ok(())
    }

    fn draw_word(&mut self, layout: &CaptionLayout, instruction: &DrawInstruction) {
        let Some(path) = self
            .typeface
            .glyph_path(&instruction.word, layout.font_size_px)
        else {
            return;
        };

        let (px, py) = layout.pivot;
        let transform = Transform::from_translate(px, py)
            .pre_scale(instruction.scale, instruction.scale)
            .pre_translate(-px, -py)
            .pre_translate(instruction.origin_x(), instruction.baseline_y);

        let mut paint = Paint {
            anti_alias: true,
            ..Paint::default()
        };

        paint.set_color(instruction.stroke.to_skia());
        let stroke = Stroke {
            width: instruction.stroke_width_px,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.canvas.stroke_path(&path, &paint, &stroke, transform, None);

        paint.set_color(instruction.fill.to_skia());
        self.canvas
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }
}

/// Timing decision for one output frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionFramePlan {
    pub frame_index: u64,
    pub time_secs: f64,
    /// Index of the active segment, if any.
    pub segment_index: Option<usize>,
    /// Last revealed word of the active segment (`-1` for none).
    pub revealed_index: isize,
}

/// Compute the caption timing decision for every output frame.
pub fn plan_caption_frames(
    segments: &[Segment],
    fps: u32,
    duration_secs: f64,
) -> Vec<CaptionFramePlan> {
    let clock = FrameClock::new(fps);
    let total_frames = clock.frames_for(duration_secs);
    let min_display = clock.frame_duration_secs();

    (0..total_frames)
        .map(|frame| {
            let time_secs = clock.frame_to_secs(frame);
            match active_segment_within(segments, time_secs, min_display) {
                Some((index, segment)) => CaptionFramePlan {
                    frame_index: frame,
                    time_secs,
                    segment_index: Some(index),
                    revealed_index: resolve_highlight(segment, time_secs).revealed_index(),
                },
                None => CaptionFramePlan {
                    frame_index: frame,
                    time_secs,
                    segment_index: None,
                    revealed_index: -1,
                },
            }
        })
        .collect()
}
