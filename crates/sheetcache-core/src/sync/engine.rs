use sheetcache_address::CellRef;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::state::{FlushEvent, FlushState};
use crate::config::CacheConfig;
use crate::credentials::{Credential, CredentialPool};
use crate::error::{Result, SheetCacheError};
use crate::key::SheetKey;
use crate::remote::{RemoteError, RemoteSheets};
use crate::store::LocalStore;

/// Retry budget and timing for remote calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            call_timeout: config.call_timeout,
        }
    }

    /// Delay after the rate-limited attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from_config(&CacheConfig::default())
    }
}

/// Outcome of a successful flush.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushResult {
    /// Requested cells the remote confirmed.
    pub committed: Vec<CellRef>,
    /// Requested cells the remote did not confirm; still dirty.
    pub failed: Vec<CellRef>,
    /// Credential used by the final attempt, `None` if nothing was sent.
    pub credential: Option<String>,
    /// Remote calls made.
    pub attempts: u32,
}

struct Attempted<T> {
    value: T,
    credential: Credential,
    attempts: u32,
}

/// Pushes a sheet's dirty cells to the remote, rotating credentials on rate limits.
pub struct SyncEngine {
    key: SheetKey,
    pool: Arc<CredentialPool>,
    remote: Arc<dyn RemoteSheets>,
    policy: RetryPolicy,
}

impl SyncEngine {
    pub fn new(
        key: SheetKey,
        pool: Arc<CredentialPool>,
        remote: Arc<dyn RemoteSheets>,
        policy: RetryPolicy,
    ) -> Self {
        SyncEngine {
            key,
            pool,
            remote,
            policy,
        }
    }

    pub fn key(&self) -> &SheetKey {
        &self.key
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send the current values of `cells` in one batch.
    ///
    /// Confirmed cells leave the dirty set unless they were rewritten while the
    /// batch was in flight. On error every requested cell stays dirty.
    pub fn flush(&self, store: &LocalStore, cells: &[CellRef]) -> Result<FlushResult> {
        let requested: Vec<CellRef> = cells
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if requested.is_empty() {
            debug!(sheet = %self.key, "nothing to flush");
            return Ok(FlushResult::default());
        }

        let state = FlushState::Idle.on(FlushEvent::Begin, self.policy.max_retries);
        let batch = store.snapshot_values(&requested);

        let attempted = self.run_with_rotation(state, "write", |credential, timeout| {
            self.remote
                .write_batch(&self.key, credential, &batch, timeout)
        })?;

        let confirmed: BTreeSet<CellRef> = attempted.value.confirmed.into_iter().collect();
        let sent: Vec<_> = batch
            .into_iter()
            .filter(|write| confirmed.contains(&write.cell))
            .collect();
        let unchanged = store.mark_committed_if_unchanged(&sent);
        store.persist()?;

        let (committed, failed): (Vec<CellRef>, Vec<CellRef>) = requested
            .into_iter()
            .partition(|cell| confirmed.contains(cell));

        if !failed.is_empty() {
            warn!(
                sheet = %self.key,
                failed = failed.len(),
                "remote did not confirm every cell; they stay dirty"
            );
        }
        info!(
            sheet = %self.key,
            committed = committed.len(),
            clean = unchanged.len(),
            credential = attempted.credential.id(),
            attempts = attempted.attempts,
            "flush succeeded"
        );

        Ok(FlushResult {
            committed,
            failed,
            credential: Some(attempted.credential.id().to_string()),
            attempts: attempted.attempts,
        })
    }

    /// Flush every dirty cell of `store`.
    pub fn flush_dirty(&self, store: &LocalStore) -> Result<FlushResult> {
        self.flush(store, &store.dirty_coordinates())
    }

    /// Read the whole sheet from the remote, with the same rotation as flushes.
    pub fn fetch_snapshot(&self) -> Result<Vec<Vec<String>>> {
        let state = FlushState::Idle.on(FlushEvent::Begin, self.policy.max_retries);
        let attempted = self.run_with_rotation(state, "read", |credential, timeout| {
            self.remote.read_all(&self.key, credential, timeout)
        })?;
        info!(
            sheet = %self.key,
            rows = attempted.value.len(),
            credential = attempted.credential.id(),
            attempts = attempted.attempts,
            "fetched remote snapshot"
        );
        Ok(attempted.value)
    }

    /// Drive the state machine from `Batching` to a terminal state.
    ///
    /// A rate-limited credential is marked failed and the next attempt waits
    /// `backoff(attempt)`. Running out of credentials after a rate limit ends
    /// the flush as exhausted with that rate limit attached. No store lock is
    /// held by the caller here.
    fn run_with_rotation<T, F>(
        &self,
        state: FlushState,
        operation: &str,
        mut call: F,
    ) -> Result<Attempted<T>>
    where
        F: FnMut(&Credential, Duration) -> std::result::Result<T, RemoteError>,
    {
        let max_retries = self.policy.max_retries;
        let mut state = state.on(FlushEvent::Batched, max_retries);
        let mut attempt = 0;
        let mut last_error: Option<RemoteError> = None;

        loop {
            let credential = match (self.pool.select(), last_error.take()) {
                (Ok(credential), _) => credential,
                (Err(err), None) => return Err(err),
                (Err(err), Some(last_error)) => {
                    error!(
                        sheet = %self.key,
                        operation,
                        attempts = attempt,
                        error = %err,
                        "credentials exhausted"
                    );
                    return Err(SheetCacheError::SyncExhausted {
                        attempts: attempt,
                        last_error,
                    });
                }
            };
            debug!(
                sheet = %self.key,
                operation,
                attempt,
                credential = credential.id(),
                "calling remote"
            );

            let err = match call(&credential, self.policy.call_timeout) {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        credential,
                        attempts: attempt + 1,
                    });
                }
                Err(err) => err,
            };

            if !err.is_rate_limited() {
                error!(sheet = %self.key, operation, error = %err, "remote call failed");
                return Err(SheetCacheError::FatalSyncError(err));
            }

            warn!(
                sheet = %self.key,
                operation,
                attempt,
                credential = credential.id(),
                error = %err,
                "rate limited"
            );
            self.pool.mark_failed(credential.id())?;

            state = state
                .on(FlushEvent::RemoteRateLimited, max_retries)
                .on(FlushEvent::Retry, max_retries);
            match state {
                FlushState::Attempting { attempt: next } => {
                    std::thread::sleep(self.policy.backoff(attempt));
                    attempt = next;
                    last_error = Some(err);
                }
                _ => {
                    error!(
                        sheet = %self.key,
                        operation,
                        attempts = attempt + 1,
                        "retries exhausted"
                    );
                    return Err(SheetCacheError::SyncExhausted {
                        attempts: attempt + 1,
                        last_error: err,
                    });
                }
            }
        }
    }
}
