//! Credential pool.
//!
//! Holds interchangeable credentials, each independently rate-limited by the
//! remote service. Selection is uniformly random among available handles;
//! failing handles are demoted until the caller resets them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SheetCacheError};

/// One unit of authentication material, handed to the remote client per call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    id: String,
    material: Arc<str>,
}

impl Credential {
    pub fn new(id: impl Into<String>, material: impl Into<Arc<str>>) -> Self {
        Credential {
            id: id.into(),
            material: material.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw material as read from the credential source (opaque to the cache).
    pub fn material(&self) -> &str {
        &self.material
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("material", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Health {
    Available,
    Cooling { until: Instant },
    Failed,
}

#[derive(Debug)]
struct CredentialHandle {
    credential: Credential,
    health: Health,
    last_failure: Option<DateTime<Utc>>,
}

/// Counts of handles by health, plus the ids of failed ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub available: usize,
    pub cooling: usize,
    pub failed: usize,
    pub failed_ids: Vec<String>,
}

struct PoolInner {
    handles: Vec<CredentialHandle>,
    rng: Box<dyn RngCore + Send>,
}

impl PoolInner {
    /// Cooling handles whose deadline has passed become available again.
    fn expire_cooling(&mut self, now: Instant) {
        for handle in &mut self.handles {
            if let Health::Cooling { until } = handle.health
                && until <= now
            {
                handle.health = Health::Available;
            }
        }
    }

    fn handle_mut(&mut self, id: &str) -> Result<&mut CredentialHandle> {
        self.handles
            .iter_mut()
            .find(|h| h.credential.id == id)
            .ok_or_else(|| SheetCacheError::UnknownCredential(id.to_string()))
    }

    fn status(&self) -> PoolStatus {
        let mut status = PoolStatus {
            total: self.handles.len(),
            ..PoolStatus::default()
        };
        for handle in &self.handles {
            match handle.health {
                Health::Available => status.available += 1,
                Health::Cooling { .. } => status.cooling += 1,
                Health::Failed => {
                    status.failed += 1;
                    status.failed_ids.push(handle.credential.id.clone());
                }
            }
        }
        status
    }
}

/// Shared across every sheet and worker; all transitions happen under one lock.
pub struct CredentialPool {
    inner: Mutex<PoolInner>,
}

impl CredentialPool {
    /// Build a pool seeded from OS entropy.
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        Self::with_rng(credentials, StdRng::from_entropy())
    }

    /// Build a pool with an explicit randomness source (deterministic in tests).
    pub fn with_rng(
        credentials: Vec<Credential>,
        rng: impl RngCore + Send + 'static,
    ) -> Result<Self> {
        if credentials.is_empty() {
            return Err(SheetCacheError::NoCredentials(
                "credential list".to_string(),
            ));
        }

        let mut handles: Vec<CredentialHandle> = Vec::with_capacity(credentials.len());
        for credential in credentials {
            if handles.iter().any(|h| h.credential.id == credential.id) {
                return Err(SheetCacheError::Config(format!(
                    "duplicate credential id: {}",
                    credential.id
                )));
            }
            handles.push(CredentialHandle {
                credential,
                health: Health::Available,
                last_failure: None,
            });
        }

        Ok(CredentialPool {
            inner: Mutex::new(PoolInner {
                handles,
                rng: Box::new(rng),
            }),
        })
    }

    /// Load every `*.json` file in `dir` as one credential, identified by file name.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let credentials = load_credential_dir(dir)?;
        if credentials.is_empty() {
            return Err(SheetCacheError::NoCredentials(dir.display().to_string()));
        }
        tracing::info!(
            count = credentials.len(),
            dir = %dir.display(),
            "loaded credentials"
        );
        Self::new(credentials)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick a random available credential.
    pub fn select(&self) -> Result<Credential> {
        let mut inner = self.inner.lock();
        inner.expire_cooling(Instant::now());

        let eligible: Vec<usize> = inner
            .handles
            .iter()
            .enumerate()
            .filter(|(_, h)| h.health == Health::Available)
            .map(|(idx, _)| idx)
            .collect();

        if eligible.is_empty() {
            let status = inner.status();
            return Err(SheetCacheError::NoCredentialAvailable {
                failed: status.failed,
                cooling: status.cooling,
                total: status.total,
            });
        }

        let pick = inner.rng.gen_range(0..eligible.len());
        Ok(inner.handles[eligible[pick]].credential.clone())
    }

    /// Demote a credential until [`reset_failed`](Self::reset_failed).
    pub fn mark_failed(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let handle = inner.handle_mut(id)?;
        handle.health = Health::Failed;
        handle.last_failure = Some(Utc::now());
        tracing::warn!(credential = id, "marking credential as failed");
        Ok(())
    }

    /// Take a credential out of rotation for `duration`.
    pub fn mark_cooling(&self, id: &str, duration: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        let handle = inner.handle_mut(id)?;
        handle.health = Health::Cooling {
            until: Instant::now() + duration,
        };
        handle.last_failure = Some(Utc::now());
        tracing::info!(credential = id, ?duration, "credential cooling down");
        Ok(())
    }

    /// Make every failed credential available again. Returns how many were reset.
    pub fn reset_failed(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut count = 0;
        for handle in &mut inner.handles {
            if handle.health == Health::Failed {
                handle.health = Health::Available;
                count += 1;
            }
        }
        tracing::info!(count, "failed credentials have been reset");
        count
    }

    pub fn status(&self) -> PoolStatus {
        let mut inner = self.inner.lock();
        inner.expire_cooling(Instant::now());
        inner.status()
    }

    pub fn health(&self, id: &str) -> Result<Health> {
        let mut inner = self.inner.lock();
        inner.expire_cooling(Instant::now());
        Ok(inner.handle_mut(id)?.health)
    }

    pub fn last_failure(&self, id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner.lock().handle_mut(id)?.last_failure)
    }
}

fn load_credential_dir(dir: &Path) -> Result<Vec<Credential>> {
    if !dir.is_dir() {
        return Err(SheetCacheError::FileNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut credentials = Vec::with_capacity(paths.len());
    for path in paths {
        let material = std::fs::read_to_string(&path)?;
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        credentials.push(Credential::new(id, material));
    }
    Ok(credentials)
}
