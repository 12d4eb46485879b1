//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

pub const KEY_TIER: &str = "TEMPLATE_STUDIO_TIER";
pub const KEY_WORKERS: &str = "TEMPLATE_STUDIO_WORKERS";
pub const KEY_FORMAT: &str = "TEMPLATE_STUDIO_FORMAT";
pub const KEY_OUTPUT_DIR: &str = "TEMPLATE_STUDIO_OUTPUT_DIR";
pub const KEY_TEXT_COLOR: &str = "TEMPLATE_STUDIO_TEXT_COLOR";

const DEFS: &[DefTuple] = &[
    (KEY_TIER, "free", "Subscription tier: free, pro, premium or platinum"),
    (KEY_WORKERS, "0", "Concurrent render workers (0 = one per CPU)"),
    (KEY_FORMAT, "png", "Output format: png, jpeg or webp"),
    (KEY_OUTPUT_DIR, ".", "Directory archives are written to"),
    (
        KEY_TEXT_COLOR,
        "#FFFFFF",
        "Text watermark colour when the settings file has none",
    ),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Default value for `key`, or an empty string for unknown keys.
pub fn default_value(key: &str) -> &'static str {
    DEFAULT_SETTINGS.get(key).map(|d| d.default).unwrap_or("")
}

/// Setting definitions in declaration order.
pub fn setting_defs() -> impl Iterator<Item = &'static SettingDef> {
    DEFS.iter().filter_map(|(key, _, _)| DEFAULT_SETTINGS.get(key))
}
