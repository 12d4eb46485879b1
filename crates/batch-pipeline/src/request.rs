//! Inputs handed to the orchestrator by the upload and settings layers.

use std::fmt;

use image_compositor::{OutputFormat, WatermarkSpec};
use template_catalog::{CUSTOM_TEMPLATE, Template, Tier};

/// A raw uploaded file.
#[derive(Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Which sizes to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRequest {
    /// Templates picked from the catalog; may contain "All Templates".
    Catalog(Vec<Template>),
    /// A single custom size.
    Custom { width: u32, height: u32 },
}

impl TemplateRequest {
    /// The synthetic template for a custom size.
    ///
    /// Built without validation: a zero size fails per job with
    /// `InvalidDimensions` like any other bad template.
    pub fn custom_template(width: u32, height: u32) -> Template {
        Template {
            name: CUSTOM_TEMPLATE.to_string(),
            width,
            height,
            platform: None,
            category: Some("custom".to_string()),
            tier: Tier::Free,
        }
    }
}

/// Everything one batch needs.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub sources: Vec<SourceFile>,
    pub templates: TemplateRequest,
    pub watermark: Option<WatermarkSpec>,
    pub tier_limit: u32,
    pub format: OutputFormat,
}

impl BatchRequest {
    pub fn new(sources: Vec<SourceFile>, templates: TemplateRequest, tier_limit: u32) -> Self {
        Self {
            sources,
            templates,
            watermark: None,
            tier_limit,
            format: OutputFormat::default(),
        }
    }

    pub fn with_watermark(mut self, watermark: WatermarkSpec) -> Self {
        self.watermark = Some(watermark);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}
