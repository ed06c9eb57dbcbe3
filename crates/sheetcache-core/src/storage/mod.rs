//! On-disk formats: the per-sheet `.cache` file and CSV.

mod atomic;
mod csv;
mod parser;
mod writer;

pub use atomic::atomic_write;
pub use csv::{parse_csv, read_csv_rows, write_csv_content, write_csv_rows};
pub use parser::{ParseError, parse_cache, parse_cache_content};
pub use writer::{CACHE_HEADER, write_cache, write_cache_content};

use sheetcache_address::CellRef;

/// One line of a cache file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedCell {
    pub cell: CellRef,
    pub value: String,
    /// Written locally and not yet confirmed by the remote.
    pub dirty: bool,
}
