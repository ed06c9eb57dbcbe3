//! Parser for the `.cache` file format

use crate::error::{Result, SheetCacheError};
use sheetcache_address::CellRef;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::CachedCell;

/// Line-level parse failure; [`parse_cache`] attaches the file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Parse a cache file.
pub fn parse_cache(path: &Path) -> Result<Vec<CachedCell>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(SheetCacheError::FileNotFound(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };

    let mut content = String::new();
    if let Err(err) = BufReader::new(file).read_to_string(&mut content) {
        if err.kind() == io::ErrorKind::InvalidData {
            return Err(SheetCacheError::StorageCorrupt {
                path: path.to_path_buf(),
                line: 0,
                message: "file is not valid UTF-8".to_string(),
            });
        }
        return Err(err.into());
    }

    parse_cache_content(&content).map_err(|err| SheetCacheError::StorageCorrupt {
        path: path.to_path_buf(),
        line: err.line,
        message: err.message,
    })
}

/// Parse cache content from a string.
pub fn parse_cache_content(content: &str) -> std::result::Result<Vec<CachedCell>, ParseError> {
    let mut cells = Vec::new();
    let mut seen = HashSet::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse "[*]CELLREF: "VALUE"" format
        let Some((label, value)) = line.split_once(':') else {
            return Err(ParseError {
                line: line_num,
                message: "Expected 'CELLREF: \"VALUE\"' format".to_string(),
            });
        };

        let label = label.trim();
        let (dirty, label) = match label.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, label),
        };

        let cell = CellRef::parse(label).map_err(|_| ParseError {
            line: line_num,
            message: format!("Invalid cell reference: {}", label),
        })?;
        if !seen.insert(cell) {
            return Err(ParseError {
                line: line_num,
                message: format!("Duplicate cell: {}", cell),
            });
        }

        let value = parse_quoted(value.trim()).ok_or_else(|| ParseError {
            line: line_num,
            message: format!("Invalid value: {}. Values must be quoted.", value.trim()),
        })?;

        cells.push(CachedCell { cell, value, dirty });
    }

    Ok(cells)
}

fn parse_quoted(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    unescape_cache_text(inner)
}

/// Reverse of the writer's escaping. Rejects unknown escapes and bare quotes.
fn unescape_cache_text(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next()? {
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                _ => return None,
            },
            '"' => return None,
            _ => out.push(ch),
        }
    }
    Some(out)
}
