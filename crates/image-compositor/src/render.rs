//! Per-template rendering: fit, watermark, encode.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
pub use template_catalog::normalize_template_name;
use template_catalog::Template;
use tracing::debug;

use crate::compose::blank_canvas;
use crate::fit::draw_fitted;
use crate::watermark::{WatermarkSpec, composite};
use crate::{CompositeError, MAX_CANVAS_PIXELS, Result};

/// Raster format of rendered outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unsupported output format '{other}'")),
        }
    }
}

/// A decoded upload, kept alive while every template for it is rendered.
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    image: DynamicImage,
}

impl SourceImage {
    /// Decode an uploaded file. Format is sniffed from the bytes.
    pub fn decode(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let image = image::load_from_memory(bytes)
            .map_err(|e| CompositeError::Decode(format!("{name}: {e}")))?;
        Self::from_image(name, image)
    }

    /// Wrap an already-decoded image.
    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CompositeError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        let name = name.into();
        debug!(name = %name, w = image.width(), h = image.height(), "Source decoded");
        Ok(Self { name, image })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without directory or extension.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// One encoded output, named for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Renders (source, template, watermark) into encoded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render and encode one output under its deterministic name.
    pub fn render(
        &self,
        source: &SourceImage,
        template: &Template,
        watermark: Option<&WatermarkSpec>,
    ) -> Result<RenderedOutput> {
        self.render_named(source, source.base_name(), template, watermark)
    }

    /// Like [`render`](Self::render) but with an explicit base name, used when
    /// a batch has to disambiguate uploads sharing a file name.
    pub fn render_named(
        &self,
        source: &SourceImage,
        base: &str,
        template: &Template,
        watermark: Option<&WatermarkSpec>,
    ) -> Result<RenderedOutput> {
        let canvas = self.render_canvas(source, template, watermark)?;
        let bytes = encode(&canvas, self.format)?;
        let name = output_name(base, template, self.format);
        debug!(name = %name, bytes = bytes.len(), "Rendered output");
        Ok(RenderedOutput { name, bytes })
    }

    /// Build the composited canvas without encoding it.
    pub fn render_canvas(
        &self,
        source: &SourceImage,
        template: &Template,
        watermark: Option<&WatermarkSpec>,
    ) -> Result<RgbaImage> {
        let area = u64::from(template.width) * u64::from(template.height);
        if area == 0 || area > MAX_CANVAS_PIXELS {
            return Err(CompositeError::InvalidDimensions {
                width: template.width,
                height: template.height,
            });
        }

        let mut canvas = blank_canvas(template.width, template.height);
        draw_fitted(&mut canvas, source.image())?;
        if let Some(spec) = watermark {
            composite(&mut canvas, spec)?;
        }
        Ok(canvas)
    }
}

/// `{base}.{template}.{W}x{H}.{ext}` with the template name normalized.
pub fn output_name(base: &str, template: &Template, format: OutputFormat) -> String {
    format!(
        "{base}.{}.{}x{}.{}",
        normalize_template_name(&template.name),
        template.width,
        template.height,
        format.extension()
    )
}

/// File name without directory or extension; falls back to `image`.
pub fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
}

/// Encode a canvas at maximum quality.
pub fn encode(canvas: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>> {
    let (w, h) = canvas.dimensions();
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
                .write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, 100).write_image(
                rgb.as_raw(),
                w,
                h,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Webp => WebPEncoder::new_lossless(&mut buf).write_image(
            canvas.as_raw(),
            w,
            h,
            ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| CompositeError::Encode(format!("{format}: {e}")))?;
    Ok(buf)
}
