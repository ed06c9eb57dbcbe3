//! Writer for the `.cache` file format

use crate::error::Result;
use std::path::Path;

use super::CachedCell;
use super::atomic::atomic_write;

pub const CACHE_HEADER: &str = "# sheetcache cache";

/// Atomically write cells to a cache file.
pub fn write_cache(path: &Path, cells: &[CachedCell]) -> Result<()> {
    let content = write_cache_content(cells);
    atomic_write(path, content.as_bytes())?;
    Ok(())
}

/// Write cells to cache format, sorted row-major. Dirty cells carry a `*`.
pub fn write_cache_content(cells: &[CachedCell]) -> String {
    let mut sorted: Vec<&CachedCell> = cells.iter().collect();
    sorted.sort_by_key(|c| c.cell);

    let mut lines = vec![CACHE_HEADER.to_string()];
    for entry in sorted {
        let marker = if entry.dirty { "*" } else { "" };
        lines.push(format!(
            "{}{}: \"{}\"",
            marker,
            entry.cell,
            escape_cache_text(&entry.value)
        ));
    }

    lines.join("\n") + "\n"
}

fn escape_cache_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
