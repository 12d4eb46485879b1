//! Watermark settings file: parsed once per batch into an immutable spec.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, anyhow};
use image_compositor::{
    Placement, WatermarkBitmap, WatermarkLayout, WatermarkSpec, parse_hex_color,
};
use serde::{Deserialize, Serialize};

use crate::config::validation::validate_color;
use crate::services::font::load_font;

/// What the watermark draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WatermarkSource {
    Image {
        path: PathBuf,
    },
    Text {
        content: String,
        font_path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

/// On-disk watermark settings.
///
/// ```json
/// { "kind": "text", "content": "DRAFT", "font_path": "fonts/Inter.ttf",
///   "color": "#FF000080", "scale_percent": 5, "tiling": true, "spacing_px": 20 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    #[serde(flatten)]
    pub source: WatermarkSource,
    #[serde(default = "default_scale")]
    pub scale_percent: f32,
    #[serde(default = "default_opacity")]
    pub opacity_percent: f32,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub tiling: bool,
    #[serde(default)]
    pub spacing_px: u32,
}

fn default_scale() -> f32 {
    WatermarkLayout::default().scale_percent
}

fn default_opacity() -> f32 {
    WatermarkLayout::default().opacity_percent
}

impl WatermarkSettings {
    /// Read a settings file. Relative asset paths resolve against its directory.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read watermark settings '{}'", path.display()))?;
        let mut settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parse watermark settings '{}'", path.display()))?;
        if let Some(dir) = path.parent() {
            settings.resolve_paths(dir);
        }
        Ok(settings)
    }

    fn resolve_paths(&mut self, dir: &Path) {
        let asset = match &mut self.source {
            WatermarkSource::Image { path } => path,
            WatermarkSource::Text { font_path, .. } => font_path,
        };
        if asset.is_relative() {
            *asset = dir.join(&*asset);
        }
    }

    pub fn layout(&self) -> anyhow::Result<WatermarkLayout> {
        let layout = WatermarkLayout {
            scale_percent: self.scale_percent,
            opacity_percent: self.opacity_percent,
            placement: self.placement,
            tiling: self.tiling,
            spacing_px: self.spacing_px,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Load the referenced assets and build the batch's watermark.
    ///
    /// Image bytes are only read here; they are decoded on first use by a
    /// render job, so a broken image fails per job rather than up front.
    pub fn into_spec(self, default_color: &str) -> anyhow::Result<WatermarkSpec> {
        let layout = self.layout()?;
        let spec = match self.source {
            WatermarkSource::Image { path } => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read watermark image '{}'", path.display()))?;
                let bitmap = WatermarkBitmap::new(path.display().to_string(), bytes);
                WatermarkSpec::image(bitmap, layout)?
            }
            WatermarkSource::Text {
                content,
                font_path,
                color,
            } => {
                let color = color.as_deref().unwrap_or(default_color);
                validate_color(color).map_err(|e| anyhow!("watermark color '{color}': {e}"))?;
                let font = load_font(&font_path)
                    .with_context(|| format!("load font '{}'", font_path.display()))?;
                WatermarkSpec::text(content, font, parse_hex_color(color)?, layout)?
            }
        };
        tracing::info!(kind = spec.kind(), tiling = layout.tiling, "Watermark configured");
        Ok(spec)
    }
}
