//! Canvas allocation and alpha blending.

use image::{Rgba, RgbaImage};

use crate::BACKGROUND;

/// Create an opaque white canvas.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, BACKGROUND)
}

/// Overlay `top` onto `base` at `(x, y)` with an extra global opacity.
///
/// Offsets may be negative or run past the edge; only the overlapping
/// region is blended.
pub fn overlay(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let base_w = i64::from(base.width());
    let base_h = i64::from(base.height());
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + i64::from(top.width())).min(base_w);
    let y_end = (y + i64::from(top.height())).min(base_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let pixel = top.get_pixel((tx - x) as u32, (ty - y) as u32);
            let alpha = f32::from(pixel[3]) / 255.0 * opacity;
            if alpha <= 0.01 {
                continue;
            }
            let (tx, ty) = (tx as u32, ty as u32);
            if alpha > 0.99 {
                base.put_pixel(tx, ty, Rgba([pixel[0], pixel[1], pixel[2], 255]));
            } else {
                let blended = blend_pixel(base.get_pixel(tx, ty), pixel, alpha);
                base.put_pixel(tx, ty, blended);
            }
        }
    }
}

/// Porter-Duff "over" with the foreground alpha already scaled.
fn blend_pixel(bg: &Rgba<u8>, fg: &Rgba<u8>, fg_alpha: f32) -> Rgba<u8> {
    let bg_alpha = f32::from(bg[3]) / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |f: u8, b: u8| -> u8 {
        let v = (f32::from(f) * fg_alpha + f32::from(b) * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
