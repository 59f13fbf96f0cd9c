//! Burnsub Render Engine
//!
//! Everything that decides what a caption looks like on a given frame,
//! shared by the burn-in export and the live preview.
//!
//! # Pipeline Architecture
//!
//! ```text
//! segments ──┐
//!            ├── Highlight Resolver (segment, t) ──┐
//! playback t ┘                                      │
//!                                                   ├── Caption Layout ──┬── Frame Compositor ── RGBA canvas
//! canvas size + style + typeface ───────────────────┘                    │
//!                                                                        └── Preview Overlay ── spans / HTML
//! ```

pub mod compositor;
pub mod font;
pub mod highlight;
pub mod layout;
pub mod preview;

pub use compositor::{plan_caption_frames, CaptionFramePlan, FrameCompositor, VideoFrame};
#[cfg(any(test, feature = "test-support"))]
pub use font::BlockTypeface;
pub use font::{load_font, CaptionFont, FontSource, TextMeasure, Typeface};
pub use highlight::{resolve_highlight, HighlightState};
pub use layout::{
    layout_caption, CaptionLayout, DrawInstruction, RenderStyle, Rgba, HIGHLIGHT_COLOR,
};
pub use preview::{OverlaySnapshot, OverlaySpan, PreviewOverlay};
