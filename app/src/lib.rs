//! Template Studio host: configuration, CLI and glue around the batch pipeline.

pub mod cli;
pub mod commands;
pub mod config;
pub mod services;
pub mod tiers;

use config::AppConfig;

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load .env, then read configuration from the environment.
pub fn init_config() -> Result<AppConfig, anyhow::Error> {
    load_dotenv();
    let config = AppConfig::load()?;
    tracing::debug!(
        tier = %config.tier,
        workers = config.workers,
        format = %config.format,
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );
    Ok(config)
}
