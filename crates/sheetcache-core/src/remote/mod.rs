//! Remote spreadsheet API interface.
//!
//! The cache never speaks HTTP itself: a [`RemoteSheets`] implementation is
//! injected and called with the credential chosen for each attempt. Errors
//! carry enough information ([`RemoteError::is_rate_limited`]) for the sync
//! engine to decide between rotating credentials and giving up.

mod csv_mirror;

pub use csv_mirror::CsvMirror;

use sheetcache_address::CellRef;
use std::fmt;
use std::time::Duration;

use crate::credentials::Credential;
use crate::key::SheetKey;

/// HTTP statuses treated as a per-credential quota rejection. The API
/// answers 403 when a single key runs out of quota.
pub const RATE_LIMIT_STATUSES: [u16; 2] = [429, 403];

/// Lowercase message fragments that identify a rate-limit rejection.
pub const RATE_LIMIT_KEYWORDS: [&str; 6] = [
    "rate limit",
    "ratelimit",
    "quota",
    "too many requests",
    "resource_exhausted",
    "user rate limit",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The remote answered with an error status.
    Http,
    /// The call exceeded the configured per-call timeout.
    Timeout,
    /// Connection-level failure before a response arrived.
    Transport,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RemoteError {
            kind: RemoteErrorKind::Http,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        RemoteError {
            kind: RemoteErrorKind::Timeout,
            status: None,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError {
            kind: RemoteErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    /// Status 429 or 403, or a message naming a rate limit or quota.
    /// Timeouts only count when their message matches.
    pub fn is_rate_limited(&self) -> bool {
        if self
            .status
            .is_some_and(|status| RATE_LIMIT_STATUSES.contains(&status))
        {
            return true;
        }
        let message = self.message.to_lowercase();
        RATE_LIMIT_KEYWORDS
            .iter()
            .any(|keyword| message.contains(keyword))
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.status) {
            (_, Some(status)) => write!(f, "HTTP {status}: {}", self.message),
            (RemoteErrorKind::Timeout, None) => write!(f, "timed out: {}", self.message),
            (_, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// One cell value in a batch write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellWrite {
    pub cell: CellRef,
    pub value: String,
}

/// Cells the remote confirms as written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    pub confirmed: Vec<CellRef>,
}

impl WriteReceipt {
    /// Receipt confirming every cell of a batch.
    pub fn all(cells: &[CellWrite]) -> Self {
        WriteReceipt {
            confirmed: cells.iter().map(|w| w.cell).collect(),
        }
    }
}

/// The remote spreadsheet API as seen by the cache.
///
/// Implementations must honor `timeout` and report an overrun as
/// [`RemoteErrorKind::Timeout`].
pub trait RemoteSheets: Send + Sync {
    /// Every row of the sheet, top to bottom.
    fn read_all(
        &self,
        sheet: &SheetKey,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<Vec<Vec<String>>, RemoteError>;

    /// Write all cells in one request.
    fn write_batch(
        &self,
        sheet: &SheetKey,
        credential: &Credential,
        cells: &[CellWrite],
        timeout: Duration,
    ) -> Result<WriteReceipt, RemoteError>;
}

/// A remote that refuses every call; for cache-only use.
#[derive(Clone, Copy, Debug, Default)]
pub struct Offline;

impl Offline {
    fn refuse(sheet: &SheetKey) -> RemoteError {
        RemoteError::transport(format!("no remote configured for {sheet}"))
    }
}

impl RemoteSheets for Offline {
    fn read_all(
        &self,
        sheet: &SheetKey,
        _credential: &Credential,
        _timeout: Duration,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        Err(Self::refuse(sheet))
    }

    fn write_batch(
        &self,
        sheet: &SheetKey,
        _credential: &Credential,
        _cells: &[CellWrite],
        _timeout: Duration,
    ) -> Result<WriteReceipt, RemoteError> {
        Err(Self::refuse(sheet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_by_status() {
        assert!(RemoteError::http(429, "slow down").is_rate_limited());
        assert!(RemoteError::http(403, "The caller does not have permission").is_rate_limited());
        assert!(RemoteError::http(403, "User Rate Limit Exceeded").is_rate_limited());
        assert!(!RemoteError::http(404, "Requested entity was not found").is_rate_limited());
        assert!(!RemoteError::http(400, "bad request").is_rate_limited());
    }

    #[test]
    fn test_rate_limit_by_message() {
        assert!(RemoteError::http(500, "Quota exceeded for quota metric 'Write requests'")
            .is_rate_limited());
        assert!(RemoteError::transport("RESOURCE_EXHAUSTED").is_rate_limited());
        assert!(RemoteError::transport("User Rate Limit Exceeded").is_rate_limited());
    }

    #[test]
    fn test_timeouts_are_not_rate_limits() {
        assert!(!RemoteError::timeout("no response within 30s").is_rate_limited());
        assert!(RemoteError::timeout("too many requests, connection dropped").is_rate_limited());
    }

    #[test]
    fn test_display() {
        assert_eq!(RemoteError::http(429, "quota").to_string(), "HTTP 429: quota");
        assert_eq!(RemoteError::timeout("30s").to_string(), "timed out: 30s");
        assert_eq!(RemoteError::transport("reset").to_string(), "reset");
    }

    #[test]
    fn test_offline_refuses() {
        let key = SheetKey::new("id", "Sheet1");
        let cred = Credential::new("k", "m");
        let err = Offline
            .read_all(&key, &cred, Duration::from_secs(1))
            .unwrap_err();
        assert!(!err.is_rate_limited());
        assert!(err.message.contains("id/Sheet1"));
    }
}
