//! Caption layout: positions, colours, and scale for one caption line.
//!
//! Shared by the export compositor and the live preview so both place every
//! word at the same spot for the same playback instant.
//!
//! # Algorithm
//!
//! 1. Scale the base font size by `canvas_width / reference_width`.
//! 2. Derive the inter-word space and outline width from the effective size.
//! 3. Measure every word with the drawing face and center the run
//!    horizontally on a baseline at 80% of the canvas height.
//! 4. If the run is wider than 90% of the canvas, shrink it uniformly about
//!    `(canvas_width / 2, baseline)`.
//! 5. Colour words up to the revealed index with the highlight colour.

use serde::Serialize;

use crate::font::TextMeasure;
use crate::highlight::HighlightState;

/// Canvas width the base font size is designed for.
pub const REFERENCE_CANVAS_WIDTH: f32 = 360.0;
/// Inter-word space as a fraction of the effective font size.
pub const SPACE_RATIO: f32 = 0.30;
/// Outline width as a fraction of the effective font size.
pub const STROKE_RATIO: f32 = 0.08;
/// Minimum outline width before the multiplier (pixels).
pub const MIN_STROKE_PX: f32 = 2.0;
/// Outline multiplier. The stroke is centered on the glyph edge, so half of
/// it is hidden under the fill.
pub const STROKE_MULTIPLIER: f32 = 2.0;
/// Baseline position as a fraction of canvas height.
pub const BASELINE_RATIO: f32 = 0.8;
/// Widest a caption line may be, as a fraction of canvas width.
pub const MAX_WIDTH_RATIO: f32 = 0.90;
/// Caption font weight (CSS scale).
pub const FONT_WEIGHT: u16 = 900;

pub const MIN_FONT_SIZE_PX: f32 = 16.0;
pub const MAX_FONT_SIZE_PX: f32 = 60.0;

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#rrggbb` notation.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Revealed-word colour (`#FACC15`).
pub const HIGHLIGHT_COLOR: Rgba = Rgba::rgb(0xFA, 0xCC, 0x15);
/// Unrevealed-word colour.
pub const BASE_COLOR: Rgba = Rgba::rgb(0xFF, 0xFF, 0xFF);
/// Outline colour.
pub const STROKE_COLOR: Rgba = Rgba::rgb(0x00, 0x00, 0x00);

/// User-tunable caption style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderStyle {
    /// Base font size at the reference canvas width, clamped to 16-60.
    pub font_size_px: f32,

    /// Canvas width the base font size is designed for.
    pub reference_canvas_width: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::new(24.0)
    }
}

impl RenderStyle {
    pub fn new(font_size_px: f32) -> Self {
        let font_size_px = if font_size_px.is_finite() {
            font_size_px.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX)
        } else {
            24.0
        };
        Self {
            font_size_px,
            reference_canvas_width: REFERENCE_CANVAS_WIDTH,
        }
    }
}

/// One word to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawInstruction {
    pub word: String,
    /// Horizontal center before the downscale transform.
    pub center_x: f32,
    pub baseline_y: f32,
    /// Measured advance width at the effective font size.
    pub width: f32,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width_px: f32,
    /// Uniform downscale applied about the layout pivot.
    pub scale: f32,
}

impl DrawInstruction {
    /// Left end of the word's baseline, before the downscale transform.
    pub fn origin_x(&self) -> f32 {
        self.center_x - self.width / 2.0
    }
}

/// Complete layout for one caption line on one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionLayout {
    pub instructions: Vec<DrawInstruction>,
    /// Unscaled run width including inter-word spaces.
    pub total_width: f32,
    /// Uniform downscale (1.0 when the run fits).
    pub scale: f32,
    /// Downscale pivot `(canvas_width / 2, baseline_y)`.
    pub pivot: (f32, f32),
    /// Effective font size after canvas scaling.
    pub font_size_px: f32,
}

impl CaptionLayout {
    fn empty(pivot: (f32, f32), font_size_px: f32) -> Self {
        Self {
            instructions: Vec::new(),
            total_width: 0.0,
            scale: 1.0,
            pivot,
            font_size_px,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Map a layout-space point through the pivot downscale.
    pub fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        let (px, py) = self.pivot;
        (px + (x - px) * self.scale, py + (y - py) * self.scale)
    }

    /// On-canvas width of the run after the downscale.
    pub fn rendered_width(&self) -> f32 {
        self.total_width * self.scale
    }
}

/// Lay out `words` for a `canvas_width` x `canvas_height` canvas.
pub fn layout_caption<M: TextMeasure + ?Sized>(
    words: &[&str],
    highlight: &HighlightState,
    canvas_width: f32,
    canvas_height: f32,
    style: &RenderStyle,
    measure: &M,
) -> CaptionLayout {
    let scale_factor = canvas_width / style.reference_canvas_width;
    let font_px = style.font_size_px * scale_factor;
    let baseline_y = canvas_height * BASELINE_RATIO;
    let pivot = (canvas_width / 2.0, baseline_y);

    if words.is_empty() {
        return CaptionLayout::empty(pivot, font_px);
    }

    let space_w = font_px * SPACE_RATIO;
    let stroke_w = (font_px * STROKE_RATIO).max(MIN_STROKE_PX) * STROKE_MULTIPLIER;

    let widths: Vec<f32> = words.iter().map(|w| measure.measure(w, font_px)).collect();
    let total_width = widths.iter().sum::<f32>() + (words.len() - 1) as f32 * space_w;

    let max_width = canvas_width * MAX_WIDTH_RATIO;
    let scale = if total_width > max_width {
        max_width / total_width
    } else {
        1.0
    };

    let mut current_x = (canvas_width - total_width) / 2.0;
    let instructions = words
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(i, (word, &width))| {
            let instruction = DrawInstruction {
                word: (*word).to_string(),
                center_x: current_x + width / 2.0,
                baseline_y,
                width,
                fill: if highlight.is_revealed(i) {
                    HIGHLIGHT_COLOR
                } else {
                    BASE_COLOR
                },
                stroke: STROKE_COLOR,
                stroke_width_px: stroke_w,
                scale,
            };
            current_x += width + space_w;
            instruction
        })
        .collect();

    CaptionLayout {
        instructions,
        total_width,
        scale,
        pivot,
        font_size_px: font_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character advances half the font size.
    struct HalfEm;

    impl TextMeasure for HalfEm {
        fn measure(&self, text: &str, font_px: f32) -> f32 {
            text.chars().count() as f32 * font_px * 0.5
        }
    }

    fn revealed(index: Option<usize>, count: usize) -> HighlightState {
        HighlightState {
            revealed: index,
            word_count: count,
        }
    }

    #[test]
    fn test_style_clamps_font_size() {
        assert_eq!(RenderStyle::new(8.0).font_size_px, 16.0);
        assert_eq!(RenderStyle::new(90.0).font_size_px, 60.0);
        assert_eq!(RenderStyle::new(30.0).font_size_px, 30.0);
        assert_eq!(RenderStyle::new(f32::NAN).font_size_px, 24.0);
    }

    #[test]
    fn test_reference_canvas_positions() {
        let layout = layout_caption(
            &["ab", "cde"],
            &revealed(Some(0), 2),
            360.0,
            640.0,
            &RenderStyle::new(24.0),
            &HalfEm,
        );

        assert!((layout.font_size_px - 24.0).abs() < 1e-4);
        assert!((layout.total_width - 67.2).abs() < 1e-3);
        assert_eq!(layout.scale, 1.0);

        let first = &layout.instructions[0];
        let second = &layout.instructions[1];
        assert!((first.center_x - 158.4).abs() < 1e-3);
        assert!((second.center_x - 195.6).abs() < 1e-3);
        assert!((first.baseline_y - 512.0).abs() < 1e-3);
        assert!((first.stroke_width_px - 4.0).abs() < 1e-4);
        assert_eq!(first.fill, HIGHLIGHT_COLOR);
        assert_eq!(second.fill, BASE_COLOR);
        assert_eq!(second.stroke, STROKE_COLOR);
    }

    #[test]
    fn test_run_is_horizontally_centered() {
        let layout = layout_caption(
            &["one", "three", "x"],
            &revealed(None, 3),
            1280.0,
            720.0,
            &RenderStyle::new(20.0),
            &HalfEm,
        );
        let first = layout.instructions.first().unwrap();
        let last = layout.instructions.last().unwrap();
        let left = first.origin_x();
        let right = last.center_x + last.width / 2.0;
        assert!((left + right - 1280.0).abs() < 1e-2);
        assert!(layout.instructions.iter().all(|i| i.fill == BASE_COLOR));
    }

    #[test]
    fn test_font_scales_with_canvas_width() {
        let style = RenderStyle::new(24.0);
        let small = layout_caption(&["a"], &revealed(None, 1), 360.0, 640.0, &style, &HalfEm);
        let large = layout_caption(&["a"], &revealed(None, 1), 720.0, 1280.0, &style, &HalfEm);
        assert!((large.font_size_px - 2.0 * small.font_size_px).abs() < 1e-4);
        // 0.08 * 48 = 3.84 > 2, doubled
        assert!((large.instructions[0].stroke_width_px - 7.68).abs() < 1e-3);
    }

    #[test]
    fn test_overwide_run_is_downscaled_to_fit() {
        let words = ["extraordinarily", "incomprehensible", "circumlocutions"];
        let layout = layout_caption(
            &words,
            &revealed(Some(2), 3),
            360.0,
            640.0,
            &RenderStyle::new(40.0),
            &HalfEm,
        );

        assert!(layout.total_width > 360.0 * MAX_WIDTH_RATIO);
        assert!(layout.scale < 1.0);
        assert!((layout.rendered_width() - 324.0).abs() < 1e-2);
        assert_eq!(layout.pivot, (180.0, 512.0));
        assert!(layout.instructions.iter().all(|i| i.scale == layout.scale));

        let (x, y) = layout.to_canvas(layout.instructions[0].origin_x(), 512.0);
        assert!((x - 18.0).abs() < 1e-2);
        assert!((y - 512.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_words_produce_empty_layout() {
        let layout = layout_caption(
            &[],
            &revealed(None, 0),
            360.0,
            640.0,
            &RenderStyle::default(),
            &HalfEm,
        );
        assert!(layout.is_empty());
        assert_eq!(layout.total_width, 0.0);
    }

    #[test]
    fn test_hex_colour() {
        assert_eq!(HIGHLIGHT_COLOR.to_hex(), "#FACC15");
    }
}
