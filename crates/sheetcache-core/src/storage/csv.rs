//! CSV reading and writing for sheet rows.

use crate::error::Result;
use std::path::Path;

use super::atomic::atomic_write;

/// Read a CSV file into rows of fields.
pub fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_csv(&content))
}

/// Parse CSV content, handling quoted fields that span commas, quotes and newlines.
/// Unquoted fields are trimmed; quoted fields are kept exactly.
pub fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    fields.push(finish_field(&mut current, field_was_quoted));
                    field_was_quoted = false;
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    fields.push(finish_field(&mut current, field_was_quoted));
                    field_was_quoted = false;
                    rows.push(std::mem::take(&mut fields));
                }
                _ => current.push(c),
            }
        }
    }
    if field_was_quoted || !current.is_empty() || !fields.is_empty() {
        fields.push(finish_field(&mut current, field_was_quoted));
        rows.push(fields);
    }
    rows
}

fn finish_field(current: &mut String, quoted: bool) -> String {
    let field = std::mem::take(current);
    if quoted {
        field
    } else {
        field.trim().to_string()
    }
}

/// Serialize rows as CSV, one line per row.
pub fn write_csv_content(rows: &[Vec<String>], guard_formulas: bool) -> String {
    let mut out = String::new();
    for row in rows {
        let fields: Vec<String> = row
            .iter()
            .map(|field| escape_csv_field(field, guard_formulas))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Atomically write rows to a CSV file.
pub fn write_csv_rows(path: &Path, rows: &[Vec<String>], guard_formulas: bool) -> Result<()> {
    atomic_write(path, write_csv_content(rows, guard_formulas).as_bytes())?;
    Ok(())
}

/// Escape a field for CSV output.
///
/// With `guard_formulas`, values that a spreadsheet app would run as a formula
/// get a leading `'`. Exports use it; the mirror stores values verbatim.
pub(crate) fn escape_csv_field(field: &str, guard_formulas: bool) -> String {
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if guard_formulas && matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains(',')
        || safe_field.contains('"')
        || safe_field.contains('\n')
        || safe_field.contains('\r')
        || safe_field != safe_field.trim()
    {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}
