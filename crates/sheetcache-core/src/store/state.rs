use parking_lot::Mutex;
use sheetcache_address::CellRef;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::key::SheetKey;

/// Grid and dirty set, always locked together.
#[derive(Debug, Default)]
pub(crate) struct SheetState {
    /// Sparse cell values. Absent cells read as `""` in ranges.
    pub(crate) grid: HashMap<CellRef, String>,
    /// Coordinates written locally and not yet confirmed remotely.
    /// Every member has a `grid` entry.
    pub(crate) dirty: BTreeSet<CellRef>,
}

impl SheetState {
    pub(crate) fn value_or_empty(&self, cell: &CellRef) -> &str {
        self.grid.get(cell).map(String::as_str).unwrap_or("")
    }
}

/// In-memory copy of one remote sheet, backed by a cache file.
///
/// All reads and writes go through one mutex, so a reader never sees a value
/// without its dirty flag or the other way around. File writes are serialized
/// by a second lock that is always taken before the state lock.
pub struct LocalStore {
    pub(crate) key: SheetKey,
    pub(crate) path: PathBuf,
    pub(crate) persist_on_write: bool,
    pub(crate) state: Mutex<SheetState>,
    pub(crate) io_lock: Mutex<()>,
}

impl LocalStore {
    /// Create an empty store whose cache file lives in `cache_dir`.
    ///
    /// Side-effect free: nothing is read or written until [`LocalStore::reload`]
    /// or [`LocalStore::persist`].
    pub fn open(key: SheetKey, cache_dir: &Path, persist_on_write: bool) -> Self {
        let path = cache_dir.join(key.cache_file_name());
        LocalStore {
            key,
            path,
            persist_on_write,
            state: Mutex::new(SheetState::default()),
            io_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &SheetKey {
        &self.key
    }

    pub fn cache_path(&self) -> &Path {
        &self.path
    }

    pub fn persist_on_write(&self) -> bool {
        self.persist_on_write
    }

    /// Number of non-absent cells.
    pub fn len(&self) -> usize {
        self.state.lock().grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().grid.is_empty()
    }
}
