//! sheetcache_address - A1-style cell and range addressing.

pub mod address;

pub use address::{AddressError, CellRef, GridRange, parse_range};
