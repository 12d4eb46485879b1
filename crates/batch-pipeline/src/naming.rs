//! Per-batch base names for archive entries.

use std::collections::HashSet;

use image_compositor::render::base_name;

/// Base names for every upload, unique within the batch.
///
/// Repeated names get `-2`, `-3`, … suffixes in upload order. Comparison
/// ignores case so entries never clash on case-insensitive file systems.
pub fn unique_base_names<'a>(file_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for file_name in file_names {
        let base = base_name(file_name);
        let mut candidate = base.to_string();
        let mut n = 2u32;
        while !seen.insert(candidate.to_lowercase()) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        names.push(candidate);
    }

    names
}
