//! Single-line text measurement and rendering for text watermarks.

use ab_glyph::{Font, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::{CompositeError, Result};

/// Bounding box of a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBox {
    /// Advance width including kerning.
    pub width: u32,
    /// Ascent plus descent.
    pub height: u32,
    /// Distance from the top of the box to the baseline.
    pub ascent: u32,
}

/// Measure the pixel width of a string at the given font and scale.
pub fn measure_text_width(font: &impl Font, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width.ceil().max(0.0) as u32
}

/// Measure the bounding box of `text` laid out as one line.
pub fn measure_box(font: &impl Font, scale: PxScale, text: &str) -> TextBox {
    let scaled = font.as_scaled(scale);
    TextBox {
        width: measure_text_width(font, scale, text),
        height: (scaled.ascent() - scaled.descent()).ceil().max(0.0) as u32,
        ascent: scaled.ascent().ceil().max(0.0) as u32,
    }
}

/// Render `text` into a transparent stamp exactly the size of its box.
///
/// Returns `None` for empty text or a degenerate box.
pub fn render_stamp(font: &impl Font, font_px: f32, text: &str, color: Rgba<u8>) -> Option<RgbaImage> {
    if text.is_empty() || font_px < 1.0 {
        return None;
    }
    let scale = PxScale::from(font_px);
    let text_box = measure_box(font, scale, text);
    if text_box.width == 0 || text_box.height == 0 {
        return None;
    }

    // Start from fully transparent pixels of the text colour so glyph
    // coverage only ever changes alpha.
    let mut stamp = RgbaImage::from_pixel(
        text_box.width,
        text_box.height,
        Rgba([color[0], color[1], color[2], 0]),
    );
    draw_text_mut(&mut stamp, color, 0, 0, scale, font, text);
    Some(stamp)
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` into an RGBA colour.
pub fn parse_hex_color(hex: &str) -> Result<Rgba<u8>> {
    let digits = hex
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| CompositeError::InvalidWatermark(format!("color must start with '#': {hex}")))?;

    let byte = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| CompositeError::InvalidWatermark(format!("invalid hex color: {hex}")))
    };

    match digits.len() {
        3 => Ok(Rgba([
            byte(&digits[0..1])? * 17,
            byte(&digits[1..2])? * 17,
            byte(&digits[2..3])? * 17,
            255,
        ])),
        6 => Ok(Rgba([
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
            255,
        ])),
        8 => Ok(Rgba([
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
            byte(&digits[6..8])?,
        ])),
        n => Err(CompositeError::InvalidWatermark(format!(
            "color must be #RGB, #RRGGBB or #RRGGBBAA, got {n} digits"
        ))),
    }
}

/// Load a system TrueType font for tests, if one is installed.
#[cfg(test)]
pub(crate) fn test_font() -> Option<ab_glyph::FontArc> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    CANDIDATES.iter().find_map(|path| {
        let data = std::fs::read(path).ok()?;
        ab_glyph::FontArc::try_from_vec(data).ok()
    })
}
