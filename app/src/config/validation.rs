//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

use super::defaults::{KEY_FORMAT, KEY_OUTPUT_DIR, KEY_TEXT_COLOR, KEY_TIER, KEY_WORKERS};

static RE_HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap()
});

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        KEY_TIER => {
            let v = value.to_ascii_lowercase();
            if !["free", "pro", "premium", "platinum"].contains(&v.as_str()) {
                return Err("must be free, pro, premium, or platinum".into());
            }
        }
        KEY_WORKERS => validate_int_range(value, 0, 256)?,
        KEY_FORMAT => {
            let v = value.to_ascii_lowercase();
            if !["png", "jpg", "jpeg", "webp"].contains(&v.as_str()) {
                return Err("must be 'png', 'jpeg' or 'webp'".into());
            }
        }
        KEY_OUTPUT_DIR => {
            if value.trim().is_empty() {
                return Err("output directory must not be empty".into());
            }
        }
        KEY_TEXT_COLOR => validate_color(value)?,
        _ => {}
    }
    Ok(())
}

/// `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
pub fn validate_color(value: &str) -> Result<(), String> {
    if !RE_HEX_COLOR.is_match(value) {
        return Err("invalid colour (expected #RGB, #RRGGBB or #RRGGBBAA)".into());
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i32, max: i32) -> Result<(), String> {
    let v: i32 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
