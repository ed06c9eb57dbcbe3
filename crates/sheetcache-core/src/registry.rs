//! Sheet registry: at most one live store and engine per sheet key.

use dashmap::DashMap;
use parking_lot::Mutex;
use sheetcache_address::{CellRef, GridRange};
use std::sync::Arc;
use tracing::info;

use crate::config::CacheConfig;
use crate::credentials::{CredentialPool, PoolStatus};
use crate::error::Result;
use crate::key::SheetKey;
use crate::remote::RemoteSheets;
use crate::store::LocalStore;
use crate::sync::{FlushResult, RetryPolicy, SyncEngine};

/// A cached sheet and the engine that syncs it.
pub struct CachedSheet {
    store: LocalStore,
    engine: SyncEngine,
}

impl CachedSheet {
    pub fn new(store: LocalStore, engine: SyncEngine) -> Self {
        CachedSheet { store, engine }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn flush(&self, cells: &[CellRef]) -> Result<FlushResult> {
        self.engine.flush(&self.store, cells)
    }

    pub fn flush_dirty(&self) -> Result<FlushResult> {
        self.engine.flush_dirty(&self.store)
    }
}

/// Entry point for callers: resolves sheet keys to cached sheets, creating
/// them on first use. Share it across threads behind an `Arc`.
pub struct SheetRegistry {
    config: CacheConfig,
    pool: Arc<CredentialPool>,
    remote: Arc<dyn RemoteSheets>,
    sheets: DashMap<SheetKey, Arc<CachedSheet>>,
    /// Per-key gates held while a sheet loads. No map guard is held across I/O.
    loading: DashMap<SheetKey, Arc<Mutex<()>>>,
}

impl SheetRegistry {
    /// Validates `config` and creates the cache directory.
    pub fn new(
        config: CacheConfig,
        pool: Arc<CredentialPool>,
        remote: Arc<dyn RemoteSheets>,
    ) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.cache_dir)?;
        info!(
            cache_dir = %config.cache_dir.display(),
            credentials = pool.len(),
            "sheet registry ready"
        );
        Ok(SheetRegistry {
            config,
            pool,
            remote,
            sheets: DashMap::new(),
            loading: DashMap::new(),
        })
    }

    /// Like [`SheetRegistry::new`], loading credentials from `config.keys_dir`.
    pub fn from_config(config: CacheConfig, remote: Arc<dyn RemoteSheets>) -> Result<Self> {
        let pool = CredentialPool::from_dir(&config.keys_dir)?;
        Self::new(config, Arc::new(pool), remote)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// The cached sheet for `key`, loading it on first use.
    ///
    /// An existing cache file is reused; otherwise the sheet is fetched from
    /// the remote and written to disk. Concurrent callers for the same key
    /// wait on that key's gate and share one copy; other keys are not blocked.
    pub fn get_or_create(&self, key: &SheetKey) -> Result<Arc<CachedSheet>> {
        if let Some(sheet) = self.get(key) {
            return Ok(sheet);
        }

        let gate = Arc::clone(self.loading.entry(key.clone()).or_default().value());
        let _loading = gate.lock();
        if let Some(sheet) = self.get(key) {
            return Ok(sheet);
        }

        let sheet = Arc::new(self.load_sheet(key)?);
        self.sheets.insert(key.clone(), Arc::clone(&sheet));
        // Late arrivals re-check `sheets` under a fresh gate.
        self.loading.remove(key);
        Ok(sheet)
    }

    fn load_sheet(&self, key: &SheetKey) -> Result<CachedSheet> {
        let store = LocalStore::open(
            key.clone(),
            &self.config.cache_dir,
            self.config.persist_on_write,
        );
        let engine = SyncEngine::new(
            key.clone(),
            Arc::clone(&self.pool),
            Arc::clone(&self.remote),
            RetryPolicy::from_config(&self.config),
        );

        if store.cache_path().is_file() {
            store.reload()?;
            info!(sheet = %key, cells = store.len(), "loaded sheet from cache");
        } else {
            let rows = engine.fetch_snapshot()?;
            store.load_from_remote_snapshot(&rows);
            store.persist()?;
            info!(sheet = %key, cells = store.len(), "created cache from remote");
        }
        Ok(CachedSheet::new(store, engine))
    }

    /// The cached sheet for `key`, if it is loaded.
    pub fn get(&self, key: &SheetKey) -> Option<Arc<CachedSheet>> {
        self.sheets.get(key).map(|sheet| Arc::clone(sheet.value()))
    }

    /// Detach a sheet without flushing. Its cache file stays on disk.
    pub fn remove(&self, key: &SheetKey) -> Option<Arc<CachedSheet>> {
        self.sheets.remove(key).map(|(_, sheet)| sheet)
    }

    pub fn clear(&self) {
        self.sheets.clear();
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Loaded sheet keys, sorted.
    pub fn keys(&self) -> Vec<SheetKey> {
        let mut keys: Vec<SheetKey> = self.sheets.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn get_value(&self, key: &SheetKey, label: &str) -> Result<Option<String>> {
        let cell = CellRef::parse(label)?;
        Ok(self.get_or_create(key)?.store().get_value(&cell))
    }

    pub fn set_value(&self, key: &SheetKey, label: &str, value: impl Into<String>) -> Result<()> {
        let cell = CellRef::parse(label)?;
        self.get_or_create(key)?.store().set_value(cell, value)
    }

    /// Values in `range`, which may be bounded (`A1:C3`) or open (`A:C`, `2:5`, `A2:C`).
    pub fn get_range(&self, key: &SheetKey, range: &str) -> Result<Vec<Vec<String>>> {
        let range = GridRange::parse(range)?;
        self.get_or_create(key)?.store().get_grid_range(&range)
    }

    /// Flush the given cells. Every label is validated before anything is sent.
    pub fn flush(&self, key: &SheetKey, labels: &[&str]) -> Result<FlushResult> {
        let cells = labels
            .iter()
            .map(|label| CellRef::parse(label))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.get_or_create(key)?.flush(&cells)
    }

    pub fn flush_dirty(&self, key: &SheetKey) -> Result<FlushResult> {
        self.get_or_create(key)?.flush_dirty()
    }

    /// Write the cache file without syncing.
    pub fn persist(&self, key: &SheetKey) -> Result<()> {
        self.get_or_create(key)?.store().persist()
    }

    /// Re-fetch the remote sheet. Dirty local values win over remote ones.
    pub fn refresh(&self, key: &SheetKey) -> Result<()> {
        let sheet = self.get_or_create(key)?;
        let rows = sheet.engine().fetch_snapshot()?;
        sheet.store().merge_remote_snapshot(&rows);
        sheet.store().persist()?;
        info!(sheet = %key, "refreshed from remote");
        Ok(())
    }

    pub fn dirty_labels(&self, key: &SheetKey) -> Result<Vec<String>> {
        Ok(self
            .get_or_create(key)?
            .store()
            .dirty_coordinates()
            .iter()
            .map(CellRef::to_string)
            .collect())
    }

    pub fn credential_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Make every failed credential available again.
    pub fn reset_failed_credentials(&self) -> usize {
        self.pool.reset_failed()
    }
}
