use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::LocalStore;
use crate::error::Result;
use crate::storage::{CachedCell, parse_cache, write_cache};

impl LocalStore {
    /// Atomically write grid and dirty flags to the cache file.
    pub fn persist(&self) -> Result<()> {
        let _io = self.io_lock.lock();
        let cells: Vec<CachedCell> = {
            let state = self.state.lock();
            state
                .grid
                .iter()
                .map(|(cell, value)| CachedCell {
                    cell: *cell,
                    value: value.clone(),
                    dirty: state.dirty.contains(cell),
                })
                .collect()
        };
        write_cache(&self.path, &cells)?;
        debug!(sheet = %self.key, path = %self.path.display(), cells = cells.len(), "persisted cache");
        Ok(())
    }

    /// Replace in-memory state with the cache file contents.
    ///
    /// Fails with `FileNotFound` or `StorageCorrupt`, leaving the current
    /// state untouched.
    pub fn reload(&self) -> Result<()> {
        let _io = self.io_lock.lock();
        let cells = parse_cache(&self.path)?;

        let mut grid = HashMap::with_capacity(cells.len());
        let mut dirty = BTreeSet::new();
        for entry in cells {
            if entry.dirty {
                dirty.insert(entry.cell);
            }
            grid.insert(entry.cell, entry.value);
        }

        let mut state = self.state.lock();
        state.grid = grid;
        state.dirty = dirty;
        debug!(sheet = %self.key, cells = state.grid.len(), dirty = state.dirty.len(), "reloaded cache");
        Ok(())
    }
}
