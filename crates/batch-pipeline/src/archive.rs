//! ZIP packaging of rendered outputs.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use image_compositor::RenderedOutput;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::{BatchError, Result};

/// MIME type of the serialized archive.
pub const ARCHIVE_MIME: &str = "application/zip";

/// Output name → bytes, built once per batch.
///
/// Entries are keyed by name only; two outputs with identical bytes stay
/// two entries.
#[derive(Debug, Default)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

/// A serialized archive ready to offer as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBlob {
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

impl ArchiveBlob {
    pub fn mime_type(&self) -> &'static str {
        ARCHIVE_MIME
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output. A name already present is an archive write error.
    pub fn insert(&mut self, output: RenderedOutput) -> Result<()> {
        if self.entries.contains_key(&output.name) {
            return Err(BatchError::ArchiveWrite(format!(
                "duplicate entry name: {}",
                output.name
            )));
        }
        self.entries.insert(output.name, output.bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialize to a deflated ZIP.
    ///
    /// Entries are written in name order with a fixed timestamp, so equal
    /// archives serialize to equal bytes.
    pub fn serialize(self) -> Result<ArchiveBlob> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut names = Vec::with_capacity(self.entries.len());

        for (name, bytes) in self.entries {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| BatchError::ArchiveWrite(format!("{name}: {e}")))?;
            writer
                .write_all(&bytes)
                .map_err(|e| BatchError::ArchiveWrite(format!("{name}: {e}")))?;
            names.push(name);
        }

        let bytes = writer
            .finish()
            .map_err(|e| BatchError::ArchiveWrite(e.to_string()))?
            .into_inner();

        debug!(entries = names.len(), bytes = bytes.len(), "Archive serialized");
        Ok(ArchiveBlob {
            bytes,
            entries: names,
        })
    }
}

/// Pack every output into one archive blob.
pub fn assemble(outputs: impl IntoIterator<Item = RenderedOutput>) -> Result<ArchiveBlob> {
    let mut archive = Archive::new();
    for output in outputs {
        archive.insert(output)?;
    }
    archive.serialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn output(name: &str, bytes: &[u8]) -> RenderedOutput {
        RenderedOutput {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn read_entry(blob: &ArchiveBlob, name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(Cursor::new(blob.bytes.as_slice())).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trips_entries() {
        let blob = assemble(vec![
            output("b.story.1080x1920.png", b"second"),
            output("a.post.1080x1080.png", b"first"),
        ])
        .unwrap();

        assert_eq!(blob.len(), 2);
        assert_eq!(blob.mime_type(), "application/zip");
        assert_eq!(blob.entries[0], "a.post.1080x1080.png");
        assert_eq!(read_entry(&blob, "a.post.1080x1080.png"), b"first");
        assert_eq!(read_entry(&blob, "b.story.1080x1920.png"), b"second");
    }

    #[test]
    fn identical_bytes_stay_separate_entries() {
        let blob = assemble(vec![
            output("p.instagram-story.1080x1920.png", b"same"),
            output("p.facebook-story.1080x1920.png", b"same"),
        ])
        .unwrap();

        let zip = ZipArchive::new(Cursor::new(blob.bytes.as_slice())).unwrap();
        assert_eq!(zip.len(), 2);
    }

    #[test]
    fn duplicate_names_fail() {
        let err = assemble(vec![output("x.png", b"1"), output("x.png", b"2")]).unwrap_err();
        assert!(matches!(err, BatchError::ArchiveWrite(msg) if msg.contains("x.png")));
    }

    #[test]
    fn serialization_is_deterministic() {
        let make = || {
            assemble(vec![output("b.png", b"bbbb"), output("a.png", b"aaaa")]).unwrap()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn empty_archive_is_still_valid_zip() {
        let blob = Archive::new().serialize().unwrap();
        assert!(blob.is_empty());
        let zip = ZipArchive::new(Cursor::new(blob.bytes.as_slice())).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
