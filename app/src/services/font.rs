//! Watermark font loading.

use std::path::Path;

use ab_glyph::FontArc;

const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024; // 50MB
const VALID_EXTENSIONS: &[&str] = &[".ttf", ".otf"];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Invalid font format (only TTF/OTF supported)")]
    InvalidFormat,
    #[error("Font file too large (max 50MB)")]
    FileTooLarge,
    #[error("Font could not be parsed: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn has_font_extension(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    VALID_EXTENSIONS.contains(&ext.as_str())
}

/// Load a TTF/OTF font from disk.
pub fn load_font(path: &Path) -> Result<FontArc, FontError> {
    if !has_font_extension(path) {
        return Err(FontError::InvalidFormat);
    }
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_FONT_SIZE {
        return Err(FontError::FileTooLarge);
    }
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data).map_err(|e| FontError::Parse(e.to_string()))?;
    tracing::debug!(path = %path.display(), bytes = meta.len(), "Font loaded");
    Ok(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let err = load_font(Path::new("fonts/logo.png")).unwrap_err();
        assert!(matches!(err, FontError::InvalidFormat));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_font(Path::new("/nonexistent/dir/font.ttf")).unwrap_err();
        assert!(matches!(err, FontError::Io(_)));
    }

    #[test]
    fn garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.TTF");
        std::fs::write(&path, b"not a font").unwrap();
        let err = load_font(&path).unwrap_err();
        assert!(matches!(err, FontError::Parse(_)));
    }
}
