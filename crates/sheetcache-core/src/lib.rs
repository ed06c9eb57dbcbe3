//! Local cache in front of a rate-limited, credential-gated spreadsheet API.
//!
//! Reads and writes hit an in-memory copy of each sheet that is mirrored to a
//! cache file. Local writes are tracked as dirty until a flush pushes them to
//! the remote, rotating through a pool of credentials when one is rate limited.

pub mod config;
pub mod credentials;
pub mod error;
pub mod key;
pub mod registry;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::CacheConfig;
pub use credentials::{Credential, CredentialPool, Health, PoolStatus};
pub use error::{Result, SheetCacheError};
pub use key::SheetKey;
pub use registry::{CachedSheet, SheetRegistry};
pub use remote::{
    CellWrite, CsvMirror, Offline, RemoteError, RemoteErrorKind, RemoteSheets, WriteReceipt,
};
pub use store::LocalStore;
pub use sync::{FlushResult, FlushState, RetryPolicy, SyncEngine};

pub use sheetcache_address::{AddressError, CellRef, GridRange};
