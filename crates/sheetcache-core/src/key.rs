//! Sheet identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one cached remote sheet. Both parts compare case-sensitively.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SheetKey {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetKey {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        SheetKey {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// File name of the local cache for this sheet.
    ///
    /// Both parts are percent-encoded so distinct keys never share a file and
    /// the name is safe on every filesystem.
    pub fn cache_file_name(&self) -> String {
        format!(
            "{}_{}.cache",
            encode_component(&self.spreadsheet_id),
            encode_component(&self.sheet_name)
        )
    }
}

impl fmt::Display for SheetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.sheet_name)
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9.-]`.
pub(crate) fn encode_component(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    if out.is_empty() || out == "." || out == ".." {
        // Keep the name a plain file in the cache directory.
        out = out.replace('.', "%2E");
        if out.is_empty() {
            out.push_str("%");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_ne!(SheetKey::new("abc", "Sheet1"), SheetKey::new("abc", "sheet1"));
        assert_eq!(SheetKey::new("abc", "Sheet1"), SheetKey::new("abc", "Sheet1"));
    }

    #[test]
    fn test_cache_file_name_is_plain() {
        assert_eq!(
            SheetKey::new("1BxiMV", "Sheet1").cache_file_name(),
            "1BxiMV_Sheet1.cache"
        );
        assert_eq!(
            SheetKey::new("id", "Q1/Q2 sales").cache_file_name(),
            "id_Q1%2FQ2%20sales.cache"
        );
    }

    #[test]
    fn test_cache_file_names_do_not_collide() {
        let a = SheetKey::new("a_b", "c").cache_file_name();
        let b = SheetKey::new("a", "b_c").cache_file_name();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dot_components_stay_in_directory() {
        assert_eq!(encode_component(".."), "%2E%2E");
        assert_eq!(encode_component(""), "%");
    }
}
