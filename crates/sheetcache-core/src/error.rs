//! Error types for sheetcache core.

use std::path::PathBuf;

use sheetcache_address::AddressError;
use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur in the sheet cache.
///
/// Remote-facing failures (`SyncExhausted`, `FatalSyncError`) never discard
/// dirty state, so the caller may retry the flush later.
#[derive(Error, Debug)]
pub enum SheetCacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("No credentials found in {0}")]
    NoCredentials(String),

    #[error("No credential available ({failed} failed, {cooling} cooling, {total} total)")]
    NoCredentialAvailable {
        failed: usize,
        cooling: usize,
        total: usize,
    },

    #[error("Unknown credential: {0}")]
    UnknownCredential(String),

    #[error("Sync exhausted after {attempts} rate-limited attempts: {last_error}")]
    SyncExhausted { attempts: u32, last_error: RemoteError },

    #[error("Remote sync failed: {0}")]
    FatalSyncError(RemoteError),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Corrupt cache file {} at line {line}: {message}", .path.display())]
    StorageCorrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SheetCacheError>;
