//! Command-line interface.

use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use image_compositor::OutputFormat;
use template_catalog::TemplateCatalog;
use tokio_util::sync::CancellationToken;

use crate::commands::{self, CustomSize, RenderOptions};
use crate::config::AppConfig;
use crate::tiers::UserTier;

#[derive(Parser, Debug)]
#[command(name = "template-studio", version, about = "Batch-render images into social media templates")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available templates grouped by platform.
    Templates(TemplatesArgs),
    /// Render source images into a ZIP archive.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Print the catalog as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show the templates available to this tier.
    #[arg(long)]
    pub tier: Option<UserTier>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Source images.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Template name; repeat for several.
    #[arg(long = "template", short = 't')]
    pub templates: Vec<String>,

    /// Render every template available to the tier.
    #[arg(long)]
    pub all: bool,

    /// Custom output size, e.g. 1080x1350.
    #[arg(long, conflicts_with_all = ["templates", "all"])]
    pub custom: Option<CustomSize>,

    /// Subscription tier (free, pro, premium, platinum).
    #[arg(long)]
    pub tier: Option<UserTier>,

    /// Output format (png, jpeg, webp).
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Concurrent render workers.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Watermark settings JSON file.
    #[arg(long)]
    pub watermark: Option<PathBuf>,

    /// Archive path. Defaults to a timestamped name in the output directory.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl RenderArgs {
    /// Merge flags over config.
    pub fn into_options(self, config: &AppConfig) -> RenderOptions {
        let output = self
            .output
            .unwrap_or_else(|| config.output_dir.join(commands::default_archive_name(Local::now())));
        RenderOptions {
            files: self.files,
            templates: self.templates,
            all: self.all,
            custom: self.custom,
            tier: self.tier.unwrap_or(config.tier),
            format: self.format.unwrap_or(config.format),
            workers: self.workers.unwrap_or(config.workers),
            watermark: self.watermark,
            text_color: config.text_color.clone(),
            output,
        }
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli, config: AppConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let catalog = TemplateCatalog::builtin()?;

    match cli.cmd {
        Command::Templates(args) => {
            let tier = args.tier.unwrap_or(config.tier);
            let listing = commands::list_templates(&tier.catalog(&catalog), args.json)?;
            print!("{listing}");
        }
        Command::Render(args) => {
            let opts = args.into_options(&config);
            tracing::info!(
                files = opts.files.len(),
                tier = %opts.tier,
                format = %opts.format,
                "Starting render"
            );
            let summary = commands::render(opts, &catalog, &cancel).await?;
            for f in &summary.failures {
                eprintln!("skipped {} -> {}: {}", f.source, f.template, f.error);
            }
            println!(
                "wrote {} ({} images, {} skipped)",
                summary.output.display(),
                summary.entries,
                summary.failures.len()
            );
        }
    }
    Ok(())
}
