//! Template rendering and watermark compositing.
//!
//! Fits a decoded source into a white letterboxed canvas, stamps an optional
//! image or text watermark (single anchor or tiled grid), and encodes the
//! result to PNG, JPEG or WebP.

pub mod compose;
pub mod fit;
pub mod placement;
pub mod render;
pub mod text;
pub mod watermark;

// Re-exports for convenience
pub use fit::{Fit, fit};
pub use placement::Placement;
pub use render::{OutputFormat, RenderedOutput, Renderer, SourceImage, output_name};
pub use text::parse_hex_color;
pub use watermark::{WatermarkBitmap, WatermarkLayout, WatermarkSpec, composite};

/// Letterbox background colour.
pub const BACKGROUND: image::Rgba<u8> = image::Rgba([255, 255, 255, 255]);

/// Inset from the canvas edge for corner-anchored watermarks.
pub const EDGE_INSET: u32 = 10;

/// Largest canvas a single output may allocate (64 Mpx, 256 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Errors that can occur while rendering a single output.
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to decode watermark image: {0}")]
    WatermarkDecode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid watermark settings: {0}")]
    InvalidWatermark(String),
}

/// Result type alias for compositing operations.
pub type Result<T> = std::result::Result<T, CompositeError>;
