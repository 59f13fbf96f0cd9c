//! Caption typefaces.
//!
//! Layout measures words with the same face the compositor draws with, so
//! measured widths and rendered glyph runs agree exactly.

use std::path::PathBuf;
use std::sync::Arc;

use burnsub_common::error::{BurnsubError, BurnsubResult};
use tiny_skia::{Path, PathBuilder};

/// Families tried, in order, when resolving the system caption font.
const PREFERRED_FAMILIES: &[&str] = &["Inter", "DejaVu Sans", "Liberation Sans", "Noto Sans"];

/// Horizontal text measurement at a given pixel size.
pub trait TextMeasure {
    /// Advance width of `text` in pixels when set at `font_px`.
    fn measure(&self, text: &str, font_px: f32) -> f32;
}

/// A drawable face.
pub trait Typeface: TextMeasure + Send + Sync {
    /// Outline of `text` at `font_px`, origin at the left end of the baseline
    /// (y grows downward). `None` when the text has no visible outline.
    fn glyph_path(&self, text: &str, font_px: f32) -> Option<Path>;

    /// Human-readable face name for logs.
    fn name(&self) -> &str;
}

/// Where the caption font comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// Heaviest available sans-serif from the system font database.
    System,
    /// A TrueType/OpenType file.
    File(PathBuf),
}

impl FontSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::System, Self::File)
    }
}

/// A parsed TrueType/OpenType face.
#[derive(Clone)]
pub struct CaptionFont {
    data: Arc<Vec<u8>>,
    index: u32,
    units_per_em: f32,
    name: String,
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionFont")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl CaptionFont {
    /// Parse a face from raw font bytes.
    pub fn from_bytes(data: Vec<u8>, index: u32, name: impl Into<String>) -> BurnsubResult<Self> {
        let units_per_em = {
            let face = ttf_parser::Face::parse(&data, index)
                .map_err(|e| BurnsubError::font(format!("Failed to parse font face: {e}")))?;
            face.units_per_em() as f32
        };
        if units_per_em <= 0.0 {
            return Err(BurnsubError::font("Font reports zero units per em"));
        }

        Ok(Self {
            data: Arc::new(data),
            index,
            units_per_em,
            name: name.into(),
        })
    }

    /// Load a face from a font file.
    pub fn from_file(path: &std::path::Path) -> BurnsubResult<Self> {
        if !path.exists() {
            return Err(BurnsubError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "caption-font".to_string());
        Self::from_bytes(data, 0, name)
    }

    /// Resolve a heavy sans-serif face from the installed system fonts.
    pub fn system_sans_black() -> BurnsubResult<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "Loaded system font database");

        let mut families: Vec<fontdb::Family<'_>> = PREFERRED_FAMILIES
            .iter()
            .map(|name| fontdb::Family::Name(*name))
            .collect();
        families.push(fontdb::Family::SansSerif);

        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::BLACK,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };

        let id = db
            .query(&query)
            .ok_or_else(|| BurnsubError::font("No sans-serif font installed on this system"))?;
        let name = db
            .face(id)
            .and_then(|info| info.families.first().map(|(family, _)| family.clone()))
            .unwrap_or_else(|| "system-sans".to_string());
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| BurnsubError::font("Selected system font could not be read"))?;

        Self::from_bytes(data, index, name)
    }

    /// Load from a [`FontSource`] synchronously.
    pub fn from_source(source: &FontSource) -> BurnsubResult<Self> {
        match source {
            FontSource::System => Self::system_sans_black(),
            FontSource::File(path) => Self::from_file(path),
        }
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }

    fn scale(&self, font_px: f32) -> f32 {
        font_px / self.units_per_em
    }
}

impl TextMeasure for CaptionFont {
    fn measure(&self, text: &str, font_px: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let scale = self.scale(font_px);
        text.chars()
            .map(|c| {
                let glyph = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
                face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale
            })
            .sum()
    }
}

impl Typeface for CaptionFont {
    fn glyph_path(&self, text: &str, font_px: f32) -> Option<Path> {
        let face = self.face()?;
        let scale = self.scale(font_px);
        let mut builder = PathBuilder::new();
        let mut pen_x = 0.0f32;

        for c in text.chars() {
            let glyph = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
            let mut sink = OutlineSink {
                builder: &mut builder,
                origin_x: pen_x,
                scale,
            };
            face.outline_glyph(glyph, &mut sink);
            pen_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }

        builder.finish()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Maps font units (y-up) onto canvas pixels (y-down) at a pen offset.
struct OutlineSink<'a> {
    builder: &'a mut PathBuilder,
    origin_x: f32,
    scale: f32,
}

impl OutlineSink<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, -y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for OutlineSink<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Load the caption font off the async runtime.
///
/// Font discovery walks the system font directories, so the work runs on a
/// blocking task; callers await readiness (usually under a timeout).
pub async fn load_font(source: FontSource) -> BurnsubResult<CaptionFont> {
    let started = std::time::Instant::now();
    let font = tokio::task::spawn_blocking(move || CaptionFont::from_source(&source))
        .await
        .map_err(|e| BurnsubError::font(format!("Font loading task failed: {e}")))??;
    tracing::info!(
        font = font.name(),
        load_ms = started.elapsed().as_millis(),
        "Caption font ready"
    );
    Ok(font)
}

/// Fixed-advance face that draws every non-space character as a solid block.
///
/// Deterministic and independent of installed fonts.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy)]
pub struct BlockTypeface {
    /// Advance per character as a fraction of the font size.
    pub advance_em: f32,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for BlockTypeface {
    fn default() -> Self {
        Self { advance_em: 0.6 }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TextMeasure for BlockTypeface {
    fn measure(&self, text: &str, font_px: f32) -> f32 {
        text.chars().count() as f32 * font_px * self.advance_em
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Typeface for BlockTypeface {
    fn glyph_path(&self, text: &str, font_px: f32) -> Option<Path> {
        let advance = font_px * self.advance_em;
        let height = font_px * 0.7;
        let mut builder = PathBuilder::new();
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x = i as f32 * advance + advance * 0.1;
            if let Some(rect) = tiny_skia::Rect::from_xywh(x, -height, advance * 0.8, height) {
                builder.push_rect(rect);
            }
        }
        builder.finish()
    }

    fn name(&self) -> &str {
        "block"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_measure_scales_with_size() {
        let face = BlockTypeface::default();
        assert!((face.measure("abcd", 10.0) - 24.0).abs() < 1e-4);
        assert!((face.measure("abcd", 20.0) - 48.0).abs() < 1e-4);
        assert_eq!(face.measure("", 20.0), 0.0);
    }

    #[test]
    fn test_block_glyph_path_sits_on_baseline() {
        let path = BlockTypeface::default().glyph_path("hi", 20.0).unwrap();
        let bounds = path.bounds();
        assert!(bounds.bottom() <= 0.0 + 1e-4);
        assert!(bounds.top() < 0.0);
        assert!(bounds.left() >= 0.0);
        assert!(bounds.right() <= 24.0 + 1e-4);
        assert!(BlockTypeface::default().glyph_path("  ", 20.0).is_none());
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        let err = CaptionFont::from_bytes(vec![0, 1, 2, 3], 0, "junk").unwrap_err();
        assert!(matches!(err, BurnsubError::Font { .. }));
    }

    #[test]
    fn test_missing_font_file() {
        let err = CaptionFont::from_file(std::path::Path::new("/nonexistent/caption.ttf"))
            .unwrap_err();
        assert!(matches!(err, BurnsubError::FileNotFound { .. }));
    }

    #[test]
    fn test_font_source_from_option() {
        assert_eq!(FontSource::from_option(None), FontSource::System);
        assert_eq!(
            FontSource::from_option(Some(PathBuf::from("a.ttf"))),
            FontSource::File(PathBuf::from("a.ttf"))
        );
    }
}
