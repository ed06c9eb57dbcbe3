use sheetcache_address::{AddressError, CellRef, GridRange};
use std::collections::HashMap;

use super::LocalStore;
use crate::error::Result;
use crate::remote::CellWrite;

/// Largest span, in cells, a single range read may cover.
pub const MAX_RANGE_CELLS: usize = 1 << 24;

fn span_cells(top_left: CellRef, bottom_right: CellRef) -> Option<usize> {
    let span = |lo: usize, hi: usize| if hi < lo { Some(0) } else { (hi - lo).checked_add(1) };
    span(top_left.row, bottom_right.row)?.checked_mul(span(top_left.col, bottom_right.col)?)
}

impl LocalStore {
    pub fn get_value(&self, cell: &CellRef) -> Option<String> {
        self.state.lock().grid.get(cell).cloned()
    }

    /// Overwrite a cell and mark it dirty. Persists the cache file when
    /// `persist_on_write` is set; the in-memory write stands even if that fails.
    pub fn set_value(&self, cell: CellRef, value: impl Into<String>) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.grid.insert(cell, value.into());
            state.dirty.insert(cell);
        }
        if self.persist_on_write {
            self.persist()?;
        }
        Ok(())
    }

    /// Values from `top_left` to `bottom_right` inclusive, row-major.
    /// Absent cells read as `""`. Spans over [`MAX_RANGE_CELLS`] are rejected.
    pub fn get_range(
        &self,
        top_left: CellRef,
        bottom_right: CellRef,
    ) -> Result<Vec<Vec<String>>> {
        if !span_cells(top_left, bottom_right).is_some_and(|cells| cells <= MAX_RANGE_CELLS) {
            return Err(AddressError::InvalidRange {
                range: format!("{top_left}:{bottom_right}"),
                reason: format!("spans more than {MAX_RANGE_CELLS} cells"),
            }
            .into());
        }
        let state = self.state.lock();
        Ok((top_left.row..=bottom_right.row)
            .map(|row| {
                (top_left.col..=bottom_right.col)
                    .map(|col| state.value_or_empty(&CellRef::new(row, col)).to_string())
                    .collect()
            })
            .collect())
    }

    /// Like [`LocalStore::get_range`], resolving open sides against the
    /// current extent. An empty resolution yields no rows.
    pub fn get_grid_range(&self, range: &GridRange) -> Result<Vec<Vec<String>>> {
        let (rows, cols) = self.extent();
        match range.resolve(rows, cols) {
            Some((top_left, bottom_right)) => self.get_range(top_left, bottom_right),
            None => Ok(Vec::new()),
        }
    }

    /// `(rows, cols)` spanned by the non-absent cells, counted from A1.
    pub fn extent(&self) -> (usize, usize) {
        let state = self.state.lock();
        state.grid.keys().fold((0, 0), |(rows, cols), cell| {
            (rows.max(cell.row + 1), cols.max(cell.col + 1))
        })
    }

    /// Dirty coordinates in row-major order.
    pub fn dirty_coordinates(&self) -> Vec<CellRef> {
        self.state.lock().dirty.iter().copied().collect()
    }

    pub fn is_dirty(&self, cell: &CellRef) -> bool {
        self.state.lock().dirty.contains(cell)
    }

    /// Current values of `cells`, ready to send. Absent cells are sent as `""`.
    pub fn snapshot_values(&self, cells: &[CellRef]) -> Vec<CellWrite> {
        let state = self.state.lock();
        cells
            .iter()
            .map(|cell| CellWrite {
                cell: *cell,
                value: state.value_or_empty(cell).to_string(),
            })
            .collect()
    }

    pub fn mark_committed(&self, cells: &[CellRef]) {
        let mut state = self.state.lock();
        for cell in cells {
            state.dirty.remove(cell);
        }
    }

    /// Clear the dirty flag of each sent cell whose value is still the one
    /// sent. Returns the cells that are now committed.
    pub fn mark_committed_if_unchanged(&self, sent: &[CellWrite]) -> Vec<CellRef> {
        let mut state = self.state.lock();
        let mut committed = Vec::with_capacity(sent.len());
        for write in sent {
            if state.value_or_empty(&write.cell) == write.value {
                state.dirty.remove(&write.cell);
                committed.push(write.cell);
            }
        }
        committed
    }

    /// Replace the grid with a remote snapshot and clear the dirty set.
    pub fn load_from_remote_snapshot(&self, rows: &[Vec<String>]) {
        let grid = grid_from_rows(rows);
        let mut state = self.state.lock();
        state.grid = grid;
        state.dirty.clear();
    }

    /// Replace the grid with a remote snapshot, keeping dirty local values.
    pub fn merge_remote_snapshot(&self, rows: &[Vec<String>]) {
        let mut grid = grid_from_rows(rows);
        let mut state = self.state.lock();
        for cell in &state.dirty {
            if let Some(value) = state.grid.get(cell) {
                grid.insert(*cell, value.clone());
            }
        }
        state.grid = grid;
    }
}

/// Sparse grid from remote rows; empty strings are absent cells.
fn grid_from_rows(rows: &[Vec<String>]) -> HashMap<CellRef, String> {
    let mut grid = HashMap::new();
    for (row, fields) in rows.iter().enumerate() {
        for (col, value) in fields.iter().enumerate() {
            if !value.is_empty() {
                grid.insert(CellRef::new(row, col), value.clone());
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetCacheError;
    use crate::key::SheetKey;
    use std::path::Path;

    fn store() -> LocalStore {
        LocalStore::open(SheetKey::new("doc", "Sheet1"), Path::new("unused"), false)
    }

    fn cell(label: &str) -> CellRef {
        CellRef::parse(label).unwrap()
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_set_marks_dirty() {
        let store = store();
        assert_eq!(store.get_value(&cell("A1")), None);
        store.set_value(cell("A1"), "X").unwrap();
        assert_eq!(store.get_value(&cell("A1")).as_deref(), Some("X"));
        assert!(store.is_dirty(&cell("A1")));
    }

    #[test]
    fn test_explicit_empty_value_is_present() {
        let store = store();
        store.set_value(cell("B3"), "").unwrap();
        assert_eq!(store.get_value(&cell("B3")).as_deref(), Some(""));
        assert_eq!(store.dirty_coordinates(), vec![cell("B3")]);
    }

    #[test]
    fn test_range_fills_absent_cells() {
        let store = store();
        store.set_value(cell("A1"), "X").unwrap();
        assert_eq!(
            store.get_range(cell("A1"), cell("B2")).unwrap(),
            rows(&[&["X", ""], &["", ""]])
        );
    }

    #[test]
    fn test_range_is_exact_span() {
        let store = store();
        store.load_from_remote_snapshot(&rows(&[&["a", "b", "c"], &["d", "e", "f"]]));
        assert_eq!(store.get_range(cell("B2"), cell("C2")).unwrap(), rows(&[&["e", "f"]]));
        assert_eq!(
            store.get_range(cell("C2"), cell("D3")).unwrap(),
            rows(&[&["f", ""], &["", ""]])
        );
    }

    #[test]
    fn test_open_ranges_resolve_against_extent() {
        let store = store();
        store.load_from_remote_snapshot(&rows(&[&["a", "b"], &["c"], &["", "", "z"]]));
        assert_eq!(store.extent(), (3, 3));

        let whole_col = GridRange::parse("A:A").unwrap();
        assert_eq!(store.get_grid_range(&whole_col).unwrap(), rows(&[&["a"], &["c"], &[""]]));

        let first_row = GridRange::parse("1:1").unwrap();
        assert_eq!(store.get_grid_range(&first_row).unwrap(), rows(&[&["a", "b", ""]]));

        let half_open = GridRange::parse("B2:C").unwrap();
        assert_eq!(store.get_grid_range(&half_open).unwrap(), rows(&[&["", ""], &["", "z"]]));
    }

    #[test]
    fn test_open_range_on_empty_store() {
        let store = store();
        assert_eq!(store.extent(), (0, 0));
        assert!(
            store
                .get_grid_range(&GridRange::parse("A:C").unwrap())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_oversized_range_is_rejected() {
        let store = store();
        store.set_value(cell("A1"), "X").unwrap();
        assert!(matches!(
            store.get_range(cell("A1"), cell("ZZZZ99999999")),
            Err(SheetCacheError::Address(AddressError::InvalidRange { .. }))
        ));
        assert!(store
            .get_range(CellRef::new(0, 0), CellRef::new(usize::MAX, usize::MAX))
            .is_err());
    }

    #[test]
    fn test_dirty_coordinates_sorted_row_major() {
        let store = store();
        for label in ["C1", "A2", "B1", "A1"] {
            store.set_value(cell(label), label).unwrap();
        }
        assert_eq!(
            store.dirty_coordinates(),
            vec![cell("A1"), cell("B1"), cell("C1"), cell("A2")]
        );
    }

    #[test]
    fn test_snapshot_load_clears_dirty() {
        let store = store();
        store.set_value(cell("A1"), "local").unwrap();
        store.load_from_remote_snapshot(&rows(&[&["remote", ""]]));
        assert_eq!(store.get_value(&cell("A1")).as_deref(), Some("remote"));
        assert_eq!(store.get_value(&cell("B1")), None);
        assert!(store.dirty_coordinates().is_empty());
    }

    #[test]
    fn test_merge_keeps_local_writes() {
        let store = store();
        store.load_from_remote_snapshot(&rows(&[&["a", "b"]]));
        store.set_value(cell("B1"), "mine").unwrap();
        store.merge_remote_snapshot(&rows(&[&["a2", "b2"], &["c2"]]));

        assert_eq!(store.get_value(&cell("A1")).as_deref(), Some("a2"));
        assert_eq!(store.get_value(&cell("B1")).as_deref(), Some("mine"));
        assert_eq!(store.get_value(&cell("A2")).as_deref(), Some("c2"));
        assert_eq!(store.dirty_coordinates(), vec![cell("B1")]);
    }

    #[test]
    fn test_commit_only_unchanged_values() {
        let store = store();
        store.set_value(cell("A1"), "one").unwrap();
        store.set_value(cell("B1"), "two").unwrap();
        let sent = store.snapshot_values(&[cell("A1"), cell("B1")]);

        // B1 changes while the batch is in flight.
        store.set_value(cell("B1"), "three").unwrap();

        let committed = store.mark_committed_if_unchanged(&sent);
        assert_eq!(committed, vec![cell("A1")]);
        assert_eq!(store.dirty_coordinates(), vec![cell("B1")]);
        assert_eq!(store.get_value(&cell("B1")).as_deref(), Some("three"));
    }

    #[test]
    fn test_snapshot_values_absent_as_empty() {
        let store = store();
        store.set_value(cell("A1"), "x").unwrap();
        let sent = store.snapshot_values(&[cell("A1"), cell("Z9")]);
        assert_eq!(sent[0].value, "x");
        assert_eq!(sent[1].value, "");
    }

    #[test]
    fn test_mark_committed() {
        let store = store();
        store.set_value(cell("A1"), "x").unwrap();
        store.set_value(cell("A2"), "y").unwrap();
        store.mark_committed(&[cell("A1")]);
        assert_eq!(store.dirty_coordinates(), vec![cell("A2")]);
        assert_eq!(store.get_value(&cell("A1")).as_deref(), Some("x"));
    }
}
