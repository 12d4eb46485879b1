//! Batch orchestration: every (source × template) pair rendered and packed
//! into one ZIP archive.
//!
//! Per-job failures are logged and skipped; only batch-level problems
//! (tier limit, nothing renderable, archive write, cancellation) fail the
//! whole request.

pub mod archive;
pub mod batch;
pub mod naming;
pub mod request;

// Re-exports for convenience
pub use archive::{ARCHIVE_MIME, Archive, ArchiveBlob, assemble};
pub use batch::{BatchOrchestrator, BatchOutput, BatchProgress, JobFailure};
pub use request::{BatchRequest, SourceFile, TemplateRequest};

/// Errors that fail a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Too many files: {count} exceeds the limit of {limit}")]
    TooManyFiles { count: usize, limit: u32 },

    #[error("No templates selected")]
    NoTemplates,

    #[error("No output could be rendered ({failed} jobs failed)")]
    EmptyResult { failed: usize },

    #[error("Failed to write archive: {0}")]
    ArchiveWrite(String),

    #[error("Batch cancelled")]
    Cancelled,
}

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;
