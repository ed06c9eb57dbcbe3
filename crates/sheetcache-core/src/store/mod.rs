//! Local store: one sheet's cells and dirty flags, backed by a cache file.

mod io;
mod ops;
mod state;

pub use ops::MAX_RANGE_CELLS;
pub use state::LocalStore;
