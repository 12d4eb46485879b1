//! Watermark settings and compositing onto a rendered canvas.
//!
//! A watermark is first turned into a stamp (the scaled logo or the rendered
//! text line), then blended once at its anchor or repeatedly over a grid.

use std::fmt;
use std::sync::{Arc, OnceLock};

use ab_glyph::FontArc;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::compose;
use crate::placement::{Placement, anchor, tile_origins};
use crate::text;
use crate::{CompositeError, Result};

type DecodeSlot = OnceLock<std::result::Result<Arc<RgbaImage>, String>>;

/// Encoded watermark image with a decode-once slot.
///
/// Clones share the slot, so however many renders use the same bitmap it is
/// decoded at most once.
#[derive(Clone)]
pub struct WatermarkBitmap {
    identity: Arc<str>,
    bytes: Arc<[u8]>,
    decoded: Arc<DecodeSlot>,
}

impl WatermarkBitmap {
    /// Wrap encoded image bytes. `identity` names the file in logs.
    pub fn new(identity: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let identity: String = identity.into();
        let bytes: Vec<u8> = bytes.into();
        Self {
            identity: Arc::from(identity),
            bytes: Arc::from(bytes),
            decoded: Arc::new(OnceLock::new()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Decode the bitmap, or return the cached result of an earlier decode.
    pub fn decode(&self) -> Result<Arc<RgbaImage>> {
        let slot = self.decoded.get_or_init(|| {
            debug!(identity = %self.identity, bytes = self.bytes.len(), "Decoding watermark image");
            image::load_from_memory(&self.bytes)
                .map(|img| Arc::new(img.to_rgba8()))
                .map_err(|e| e.to_string())
        });
        slot.clone().map_err(CompositeError::WatermarkDecode)
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }
}

impl fmt::Debug for WatermarkBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkBitmap")
            .field("identity", &self.identity)
            .field("bytes", &self.bytes.len())
            .field("decoded", &self.is_decoded())
            .finish()
    }
}

/// Size, opacity and placement shared by both watermark kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkLayout {
    /// Stamp width (image) or font size (text) as a percentage of canvas width.
    pub scale_percent: f32,
    pub opacity_percent: f32,
    /// Ignored when `tiling` is set.
    pub placement: Placement,
    pub tiling: bool,
    pub spacing_px: u32,
}

impl Default for WatermarkLayout {
    fn default() -> Self {
        Self {
            scale_percent: 20.0,
            opacity_percent: 50.0,
            placement: Placement::default(),
            tiling: false,
            spacing_px: 0,
        }
    }
}

impl WatermarkLayout {
    pub fn new(scale_percent: f32, opacity_percent: f32) -> Result<Self> {
        let layout = Self {
            scale_percent,
            opacity_percent,
            ..Self::default()
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self.tiling = false;
        self
    }

    pub fn tiled(mut self, spacing_px: u32) -> Self {
        self.tiling = true;
        self.spacing_px = spacing_px;
        self
    }

    /// Global alpha applied to every watermark draw.
    pub fn opacity(&self) -> f32 {
        self.opacity_percent / 100.0
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f32| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.scale_percent) {
            return Err(CompositeError::InvalidWatermark(format!(
                "scale must be between 0 and 100, got {}",
                self.scale_percent
            )));
        }
        if !in_range(self.opacity_percent) {
            return Err(CompositeError::InvalidWatermark(format!(
                "opacity must be between 0 and 100, got {}",
                self.opacity_percent
            )));
        }
        Ok(())
    }

    fn percent_of(&self, canvas_w: u32) -> f64 {
        f64::from(canvas_w) * f64::from(self.scale_percent) / 100.0
    }
}

/// Immutable watermark settings for one batch.
#[derive(Clone)]
pub enum WatermarkSpec {
    Image {
        bitmap: WatermarkBitmap,
        layout: WatermarkLayout,
    },
    Text {
        content: String,
        font: FontArc,
        color: Rgba<u8>,
        layout: WatermarkLayout,
    },
}

impl WatermarkSpec {
    pub fn image(bitmap: WatermarkBitmap, layout: WatermarkLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self::Image { bitmap, layout })
    }

    pub fn text(
        content: impl Into<String>,
        font: FontArc,
        color: Rgba<u8>,
        layout: WatermarkLayout,
    ) -> Result<Self> {
        layout.validate()?;
        Ok(Self::Text {
            content: content.into(),
            font,
            color,
            layout,
        })
    }

    pub fn layout(&self) -> &WatermarkLayout {
        match self {
            Self::Image { layout, .. } | Self::Text { layout, .. } => layout,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
        }
    }

    /// Build the stamp for a canvas of the given width.
    ///
    /// `Ok(None)` means there is nothing to draw (empty text, zero scale).
    fn stamp(&self, canvas_w: u32) -> Result<Option<RgbaImage>> {
        match self {
            Self::Image { bitmap, layout } => {
                let source = bitmap.decode()?;
                let (bw, bh) = source.dimensions();
                if bw == 0 || bh == 0 {
                    return Err(CompositeError::WatermarkDecode(format!(
                        "{} has no pixels",
                        bitmap.identity()
                    )));
                }
                let width = layout.percent_of(canvas_w).round() as u32;
                if width == 0 {
                    return Ok(None);
                }
                let height = ((f64::from(width) * f64::from(bh) / f64::from(bw)).round() as u32).max(1);
                if (width, height) == (bw, bh) {
                    return Ok(Some(source.as_ref().clone()));
                }
                Ok(Some(image::imageops::resize(
                    source.as_ref(),
                    width,
                    height,
                    FilterType::Lanczos3,
                )))
            }
            Self::Text {
                content,
                font,
                color,
                layout,
            } => {
                if content.is_empty() {
                    return Ok(None);
                }
                let font_px = layout.percent_of(canvas_w).floor() as f32;
                Ok(text::render_stamp(font, font_px, content, *color))
            }
        }
    }
}

impl fmt::Debug for WatermarkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { bitmap, layout } => f
                .debug_struct("Image")
                .field("bitmap", bitmap)
                .field("layout", layout)
                .finish(),
            Self::Text {
                content,
                color,
                layout,
                ..
            } => f
                .debug_struct("Text")
                .field("content", content)
                .field("color", color)
                .field("layout", layout)
                .finish(),
        }
    }
}

/// Draw the watermark onto `canvas` in place. Returns the number of stamps drawn.
///
/// The canvas is never resized; stamps running past the edge are clipped.
pub fn composite(canvas: &mut RgbaImage, spec: &WatermarkSpec) -> Result<usize> {
    let layout = spec.layout();
    let Some(stamp) = spec.stamp(canvas.width())? else {
        debug!(kind = spec.kind(), "Watermark has nothing to draw");
        return Ok(0);
    };

    let (cw, ch) = canvas.dimensions();
    let (bw, bh) = stamp.dimensions();
    let origins = if layout.tiling {
        tile_origins(cw, ch, bw, bh, layout.spacing_px)
    } else {
        vec![anchor(layout.placement, cw, ch, bw, bh)]
    };

    let opacity = layout.opacity();
    for &(x, y) in &origins {
        compose::overlay(canvas, &stamp, x, y, opacity);
    }

    debug!(
        kind = spec.kind(),
        stamp_w = bw,
        stamp_h = bh,
        draws = origins.len(),
        tiling = layout.tiling,
        "Watermark composited"
    );
    Ok(origins.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BACKGROUND;
    use crate::compose::blank_canvas;
    use crate::placement::tile_count;
    use ab_glyph::PxScale;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn black_logo(w: u32, h: u32) -> WatermarkBitmap {
        WatermarkBitmap::new("logo.png", png_bytes(RgbaImage::from_pixel(w, h, BLACK)))
    }

    #[test]
    fn layout_rejects_out_of_range_percentages() {
        assert!(WatermarkLayout::new(50.0, 50.0).is_ok());
        assert!(WatermarkLayout::new(0.0, 100.0).is_ok());
        assert!(WatermarkLayout::new(101.0, 50.0).is_err());
        assert!(WatermarkLayout::new(50.0, -1.0).is_err());
        assert!(WatermarkLayout::new(f32::NAN, 50.0).is_err());
    }

    #[test]
    fn image_watermark_lands_bottom_right() {
        let layout = WatermarkLayout::new(10.0, 100.0).unwrap().placed(Placement::BottomRight);
        let spec = WatermarkSpec::image(black_logo(10, 5), layout).unwrap();
        let mut canvas = blank_canvas(200, 100);

        assert_eq!(composite(&mut canvas, &spec).unwrap(), 1);

        // 20x10 stamp at (170, 80).
        assert_eq!(canvas.get_pixel(175, 85), &BLACK);
        assert_eq!(canvas.get_pixel(165, 85), &BACKGROUND);
        assert_eq!(canvas.get_pixel(195, 95), &BACKGROUND);
        assert_eq!(canvas.dimensions(), (200, 100));
    }

    #[test]
    fn opacity_scales_the_blend() {
        let layout = WatermarkLayout::new(100.0, 50.0).unwrap().placed(Placement::Center);
        let spec = WatermarkSpec::image(black_logo(4, 4), layout).unwrap();
        let mut canvas = blank_canvas(8, 8);
        composite(&mut canvas, &spec).unwrap();
        let p = canvas.get_pixel(4, 4);
        assert!((126..=129).contains(&p[0]), "got {p:?}");
    }

    #[test]
    fn tiling_ignores_placement_and_covers_grid() {
        let layout = WatermarkLayout::new(10.0, 100.0)
            .unwrap()
            .placed(Placement::Center)
            .tiled(5);
        let spec = WatermarkSpec::image(black_logo(10, 10), layout).unwrap();
        let mut canvas = blank_canvas(100, 60);

        let draws = composite(&mut canvas, &spec).unwrap();
        assert_eq!(draws, tile_count(100, 60, 10, 10, 5));
        assert_eq!(canvas.get_pixel(0, 0), &BLACK);
        assert_eq!(canvas.get_pixel(15, 15), &BLACK);
        assert_eq!(canvas.get_pixel(12, 2), &BACKGROUND);
    }

    #[test]
    fn undecodable_bitmap_fails_and_is_cached() {
        let bitmap = WatermarkBitmap::new("broken.png", b"not an image".to_vec());
        let spec = WatermarkSpec::image(bitmap.clone(), WatermarkLayout::default()).unwrap();
        let mut canvas = blank_canvas(10, 10);

        assert!(matches!(
            composite(&mut canvas, &spec),
            Err(CompositeError::WatermarkDecode(_))
        ));
        // The clone shares the same decode slot.
        assert!(bitmap.is_decoded());
        assert!(canvas.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn bitmap_decodes_once_across_clones() {
        let bitmap = black_logo(3, 3);
        let other = bitmap.clone();
        assert!(!other.is_decoded());
        let first = bitmap.decode().unwrap();
        let second = other.decode().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn zero_scale_draws_nothing() {
        let layout = WatermarkLayout::new(0.0, 100.0).unwrap();
        let spec = WatermarkSpec::image(black_logo(10, 10), layout).unwrap();
        let mut canvas = blank_canvas(50, 50);
        assert_eq!(composite(&mut canvas, &spec).unwrap(), 0);
    }

    #[test]
    fn empty_text_is_noop() {
        let Some(font) = text::test_font() else { return };
        let spec = WatermarkSpec::text("", font, BLACK, WatermarkLayout::default()).unwrap();
        let mut canvas = blank_canvas(50, 50);
        assert_eq!(composite(&mut canvas, &spec).unwrap(), 0);
        assert!(canvas.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn text_tiling_matches_measured_box() {
        let Some(font) = text::test_font() else { return };
        let layout = WatermarkLayout::new(10.0, 60.0).unwrap().tiled(20);
        let spec = WatermarkSpec::text("DRAFT", font.clone(), BLACK, layout).unwrap();
        let mut canvas = blank_canvas(1080, 1080);

        let draws = composite(&mut canvas, &spec).unwrap();
        let b = text::measure_box(&font, PxScale::from(108.0), "DRAFT");
        assert_eq!(draws, tile_count(1080, 1080, b.width, b.height, 20));
        assert!(canvas.pixels().any(|p| p[0] < 200));
    }

    #[test]
    fn text_watermark_respects_top_left_inset() {
        let Some(font) = text::test_font() else { return };
        let layout = WatermarkLayout::new(20.0, 100.0).unwrap().placed(Placement::TopLeft);
        let spec = WatermarkSpec::text("MMMM", font, BLACK, layout).unwrap();
        let mut canvas = blank_canvas(400, 200);
        composite(&mut canvas, &spec).unwrap();

        for y in 0..10 {
            for x in 0..400 {
                assert_eq!(canvas.get_pixel(x, y), &BACKGROUND, "({x}, {y}) touched");
            }
        }
        assert!(canvas.pixels().any(|p| p[0] < 128));
    }
}
