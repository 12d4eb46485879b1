//! Host-level operations behind the CLI subcommands.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context as _, bail};
use batch_pipeline::{
    BatchOrchestrator, BatchProgress, BatchRequest, JobFailure, SourceFile, TemplateRequest,
};
use chrono::{DateTime, Local};
use image_compositor::OutputFormat;
use template_catalog::{ALL_TEMPLATES, TemplateCatalog, TemplateSelection};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::services::watermark::WatermarkSettings;
use crate::tiers::UserTier;

/// A `WIDTHxHEIGHT` size override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for CustomSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
        let height = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
        Ok(Self { width, height })
    }
}

/// Everything `render` needs, after CLI flags and config are merged.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub files: Vec<PathBuf>,
    pub templates: Vec<String>,
    pub all: bool,
    pub custom: Option<CustomSize>,
    pub tier: UserTier,
    pub format: OutputFormat,
    /// 0 means one worker per CPU.
    pub workers: usize,
    pub watermark: Option<PathBuf>,
    pub text_color: String,
    pub output: PathBuf,
}

/// Outcome of a finished `render`.
#[derive(Debug)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub entries: usize,
    pub failures: Vec<JobFailure>,
}

/// Render the catalog as a platform-grouped listing or as JSON.
pub fn list_templates(catalog: &TemplateCatalog, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(catalog.templates())?);
    }

    let mut out = String::new();
    writeln!(out, "{ALL_TEMPLATES} ({})", catalog.len())?;
    for (platform, templates) in catalog.by_platform() {
        writeln!(out, "{platform}")?;
        for t in templates {
            writeln!(
                out,
                "  {:<24} {:>10}  {}",
                t.name,
                t.size_label(),
                t.tier.as_str()
            )?;
        }
    }
    Ok(out)
}

/// Default archive name, e.g. `templates-20240131-093000.zip`.
pub fn default_archive_name(now: DateTime<Local>) -> String {
    format!("templates-{}.zip", now.format("%Y%m%d-%H%M%S"))
}

/// Turn template flags into a request against the tier's catalog.
pub fn template_request(
    catalog: &TemplateCatalog,
    names: &[String],
    all: bool,
    custom: Option<CustomSize>,
) -> anyhow::Result<TemplateRequest> {
    if let Some(size) = custom {
        if all || !names.is_empty() {
            bail!("--custom cannot be combined with --template or --all");
        }
        return Ok(TemplateRequest::Custom {
            width: size.width,
            height: size.height,
        });
    }

    let mut selection = TemplateSelection::new();
    for name in names {
        if !selection.is_selected(name) {
            selection.toggle(name);
        }
    }
    if all {
        selection.toggle(ALL_TEMPLATES);
    }
    let templates = selection
        .resolve(catalog)
        .context("template not available for this tier")?;
    Ok(TemplateRequest::Catalog(templates))
}

async fn read_sources(files: &[PathBuf]) -> anyhow::Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read source '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        sources.push(SourceFile::new(file_name, bytes));
    }
    Ok(sources)
}

async fn log_progress(mut rx: watch::Receiver<BatchProgress>) {
    while rx.changed().await.is_ok() {
        let p = *rx.borrow_and_update();
        tracing::debug!(
            completed = p.completed,
            failed = p.failed,
            total = p.total,
            "Batch progress"
        );
    }
}

async fn write_archive(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("write archive '{}'", path.display()))
}

/// Run one batch and write its archive to `opts.output`.
pub async fn render(
    opts: RenderOptions,
    catalog: &TemplateCatalog,
    cancel: &CancellationToken,
) -> anyhow::Result<RenderSummary> {
    if opts.files.len() > opts.tier.file_limit() as usize {
        // Checked again by the orchestrator; failing here skips reading files.
        bail!(batch_pipeline::BatchError::TooManyFiles {
            count: opts.files.len(),
            limit: opts.tier.file_limit(),
        });
    }

    let tier_catalog = Arc::new(opts.tier.catalog(catalog));
    let templates = template_request(&tier_catalog, &opts.templates, opts.all, opts.custom)?;
    let watermark = match &opts.watermark {
        Some(path) => Some(WatermarkSettings::from_path(path)?.into_spec(&opts.text_color)?),
        None => None,
    };
    let sources = read_sources(&opts.files).await?;

    let mut request =
        BatchRequest::new(sources, templates, opts.tier.file_limit()).with_format(opts.format);
    if let Some(spec) = watermark {
        request = request.with_watermark(spec);
    }

    let mut orchestrator = BatchOrchestrator::new(tier_catalog);
    if opts.workers > 0 {
        orchestrator = orchestrator.with_workers(opts.workers);
    }

    let (tx, rx) = watch::channel(BatchProgress::default());
    let progress = tokio::spawn(log_progress(rx));
    let result = orchestrator.process_with_progress(request, cancel, tx).await;
    progress.abort();
    let output = result?;

    write_archive(&opts.output, &output.archive.bytes).await?;
    tracing::info!(
        path = %opts.output.display(),
        entries = output.archive.len(),
        failed = output.failures.len(),
        "Archive written"
    );

    Ok(RenderSummary {
        output: opts.output,
        entries: output.archive.len(),
        failures: output.failures,
    })
}
