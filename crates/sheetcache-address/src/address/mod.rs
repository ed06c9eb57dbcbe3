//! Cell and range addressing.
//!
//! - [`CellRef`] - Cell label parsing (A1 notation <-> row/col indices)
//! - [`GridRange`] - Bounded and open-ended range labels
//! - [`parse_range`] - Bounded rectangle corners from a range label

mod cell_ref;
mod range;

pub use cell_ref::CellRef;
pub use range::{GridRange, parse_range};

use thiserror::Error;

/// Malformed addressing input. Always local, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid cell label: {0:?}")]
    InvalidLabel(String),

    #[error("Invalid range {range:?}: {reason}")]
    InvalidRange { range: String, reason: String },
}
