//! Runtime application configuration loaded from the environment.

use std::path::PathBuf;

use anyhow::anyhow;
use image_compositor::OutputFormat;

use super::defaults::{
    KEY_FORMAT, KEY_OUTPUT_DIR, KEY_TEXT_COLOR, KEY_TIER, KEY_WORKERS, default_value,
};
use super::validation::validate_setting;
use crate::tiers::UserTier;

/// Runtime configuration. CLI flags override individual fields.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tier: UserTier,
    /// 0 means one worker per CPU.
    pub workers: usize,
    pub format: OutputFormat,
    pub output_dir: PathBuf,
    pub text_color: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tier: UserTier::Free,
            workers: 0,
            format: OutputFormat::Png,
            output_dir: PathBuf::from("."),
            text_color: "#FFFFFF".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Missing or blank values fall back to defaults; present values must
    /// pass [`validate_setting`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> Result<String, anyhow::Error> {
            let value = lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default_value(key).to_string());
            validate_setting(key, &value).map_err(|e| anyhow!("{key}: {e}"))?;
            Ok(value)
        };

        Ok(Self {
            tier: g(KEY_TIER)?.parse().map_err(|e| anyhow!("{KEY_TIER}: {e}"))?,
            workers: g(KEY_WORKERS)?.parse()?,
            format: g(KEY_FORMAT)?
                .parse()
                .map_err(|e| anyhow!("{KEY_FORMAT}: {e}"))?,
            output_dir: PathBuf::from(g(KEY_OUTPUT_DIR)?),
            text_color: g(KEY_TEXT_COLOR)?,
        })
    }
}
