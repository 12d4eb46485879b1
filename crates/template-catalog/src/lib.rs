//! Registry of named output sizes for social platforms.
//!
//! The catalog is pure data: templates are built once, never mutated,
//! and shared read-only between every render in a batch.

pub mod catalog;
pub mod defaults;
pub mod selection;

// Re-exports for convenience
pub use catalog::{Template, TemplateCatalog, Tier, normalize_template_name};
pub use selection::TemplateSelection;

/// Name of the pseudo-template that stands for every catalog entry.
pub const ALL_TEMPLATES: &str = "All Templates";

/// Name given to the synthetic template built from a custom size override.
pub const CUSTOM_TEMPLATE: &str = "Custom";

/// Errors raised while building or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid template dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Duplicate template name: {0}")]
    DuplicateName(String),

    #[error("Reserved template name: {0}")]
    ReservedName(String),
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
