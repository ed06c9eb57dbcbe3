//! Sync engine: batches dirty cells and pushes them through the credential pool.

mod engine;
mod state;

pub use engine::{FlushResult, RetryPolicy, SyncEngine};
pub use state::{FlushEvent, FlushState};
