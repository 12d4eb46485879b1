//! `template-studio` command-line entry point.
//!
//! Parses arguments, loads configuration and runs one command. Ctrl+C
//! cancels an in-flight batch; nothing is written in that case.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use template_studio_lib::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = template_studio_lib::init_config()?;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, cancelling batch");
            token.cancel();
        }
    });

    cli::run(cli, config, cancel).await
}
