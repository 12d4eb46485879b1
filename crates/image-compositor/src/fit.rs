//! Aspect-preserving letterbox fitting.
//!
//! The source is scaled to fit entirely inside the target and centered;
//! the uncovered border keeps the canvas background.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::{CompositeError, Result};

/// Scale and offset that letterbox a source into a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
    target_width: u32,
    target_height: u32,
}

/// Compute the contain-fit of a `source_w × source_h` image in a
/// `target_w × target_h` canvas.
pub fn fit(source_w: u32, source_h: u32, target_w: u32, target_h: u32) -> Result<Fit> {
    if source_w == 0 || source_h == 0 {
        return Err(CompositeError::InvalidDimensions {
            width: source_w,
            height: source_h,
        });
    }
    if target_w == 0 || target_h == 0 {
        return Err(CompositeError::InvalidDimensions {
            width: target_w,
            height: target_h,
        });
    }

    let (sw, sh) = (f64::from(source_w), f64::from(source_h));
    let (tw, th) = (f64::from(target_w), f64::from(target_h));

    let scale = (tw / sw).min(th / sh);
    let scaled_width = sw * scale;
    let scaled_height = sh * scale;

    Ok(Fit {
        scale,
        offset_x: (tw - scaled_width) / 2.0,
        offset_y: (th - scaled_height) / 2.0,
        scaled_width,
        scaled_height,
        target_width: target_w,
        target_height: target_h,
    })
}

impl Fit {
    /// Scaled size rounded to whole pixels, never exceeding the target.
    pub fn pixel_size(&self) -> (u32, u32) {
        let w = (self.scaled_width.round() as u32).clamp(1, self.target_width);
        let h = (self.scaled_height.round() as u32).clamp(1, self.target_height);
        (w, h)
    }

    /// Top-left pixel offset that centers [`pixel_size`](Self::pixel_size).
    pub fn pixel_offset(&self) -> (u32, u32) {
        let (w, h) = self.pixel_size();
        ((self.target_width - w) / 2, (self.target_height - h) / 2)
    }
}

/// Scale `source` into `canvas` with letterboxing and return the fit used.
pub fn draw_fitted(canvas: &mut RgbaImage, source: &DynamicImage) -> Result<Fit> {
    let f = fit(source.width(), source.height(), canvas.width(), canvas.height())?;
    let (w, h) = f.pixel_size();
    let (x, y) = f.pixel_offset();

    debug!(
        src_w = source.width(),
        src_h = source.height(),
        dst_w = w,
        dst_h = h,
        x,
        y,
        scale = f.scale,
        "Fitting source into canvas"
    );

    let scaled = if (w, h) == (source.width(), source.height()) {
        source.to_rgba8()
    } else {
        source.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
    };
    image::imageops::overlay(canvas, &scaled, i64::from(x), i64::from(y));

    Ok(f)
}
