//! Watermark anchor and tiling-grid positions.
//!
//! All coordinates are the top-left corner of the watermark's bounding box.
//! They may be negative or run past the canvas; the blend clips them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EDGE_INSET;

/// Where a single (non-tiled) watermark is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" => Ok(Self::Center),
            other => Err(format!("unknown placement '{other}'")),
        }
    }
}

/// Top-left position of a `box_w × box_h` watermark anchored on the canvas.
pub fn anchor(placement: Placement, canvas_w: u32, canvas_h: u32, box_w: u32, box_h: u32) -> (i64, i64) {
    let (cw, ch) = (i64::from(canvas_w), i64::from(canvas_h));
    let (bw, bh) = (i64::from(box_w), i64::from(box_h));
    let m = i64::from(EDGE_INSET);

    match placement {
        Placement::TopLeft => (m, m),
        Placement::TopRight => (cw - bw - m, m),
        Placement::BottomLeft => (m, ch - bh - m),
        Placement::BottomRight => (cw - bw - m, ch - bh - m),
        Placement::Center => ((cw - bw) / 2, (ch - bh) / 2),
    }
}

/// Grid origins for a tiled watermark, row by row from (0, 0).
///
/// The step is the box size plus `spacing`; every origin inside the canvas
/// gets a tile. A zero step yields no tiles.
pub fn tile_origins(canvas_w: u32, canvas_h: u32, box_w: u32, box_h: u32, spacing: u32) -> Vec<(i64, i64)> {
    let step_x = i64::from(box_w) + i64::from(spacing);
    let step_y = i64::from(box_h) + i64::from(spacing);
    if step_x == 0 || step_y == 0 {
        return Vec::new();
    }

    let mut origins = Vec::with_capacity(tile_count(canvas_w, canvas_h, box_w, box_h, spacing));
    let mut y = 0i64;
    while y < i64::from(canvas_h) {
        let mut x = 0i64;
        while x < i64::from(canvas_w) {
            origins.push((x, y));
            x += step_x;
        }
        y += step_y;
    }
    origins
}

/// Number of tiles [`tile_origins`] produces: `ceil(W/(w+s)) × ceil(H/(h+s))`.
pub fn tile_count(canvas_w: u32, canvas_h: u32, box_w: u32, box_h: u32, spacing: u32) -> usize {
    let step_x = u64::from(box_w) + u64::from(spacing);
    let step_y = u64::from(box_h) + u64::from(spacing);
    if step_x == 0 || step_y == 0 {
        return 0;
    }
    let cols = u64::from(canvas_w).div_ceil(step_x);
    let rows = u64::from(canvas_h).div_ceil(step_y);
    (cols * rows) as usize
}
