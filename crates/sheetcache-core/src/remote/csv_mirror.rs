use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CellWrite, RemoteError, RemoteSheets, WriteReceipt};
use crate::credentials::Credential;
use crate::key::{SheetKey, encode_component};
use crate::storage::{read_csv_rows, write_csv_rows};

/// A directory of CSV files standing in for the remote service.
///
/// Each sheet lives at `<dir>/<spreadsheet>/<sheet>.csv`. A sheet must exist
/// before it can be read or written, like a real spreadsheet tab; a missing
/// file answers with HTTP 404. Credentials are accepted but not checked.
pub struct CsvMirror {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvMirror {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the CSV file backing `sheet`.
    pub fn sheet_path(&self, sheet: &SheetKey) -> PathBuf {
        self.dir
            .join(encode_component(&sheet.spreadsheet_id))
            .join(format!("{}.csv", encode_component(&sheet.sheet_name)))
    }

    /// Create or replace a sheet's contents.
    pub fn put_sheet(&self, sheet: &SheetKey, rows: &[Vec<String>]) -> Result<(), RemoteError> {
        let _guard = self.write_lock.lock();
        write_csv_rows(&self.sheet_path(sheet), rows, false)
            .map_err(|err| RemoteError::transport(err.to_string()))
    }

    fn read_rows(&self, sheet: &SheetKey) -> Result<Vec<Vec<String>>, RemoteError> {
        let path = self.sheet_path(sheet);
        if !path.is_file() {
            return Err(RemoteError::http(
                404,
                format!("Requested entity was not found: {sheet}"),
            ));
        }
        read_csv_rows(&path).map_err(|err| RemoteError::transport(err.to_string()))
    }
}

impl RemoteSheets for CsvMirror {
    fn read_all(
        &self,
        sheet: &SheetKey,
        _credential: &Credential,
        _timeout: Duration,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        self.read_rows(sheet)
    }

    fn write_batch(
        &self,
        sheet: &SheetKey,
        _credential: &Credential,
        cells: &[CellWrite],
        _timeout: Duration,
    ) -> Result<WriteReceipt, RemoteError> {
        let _guard = self.write_lock.lock();
        let mut rows = self.read_rows(sheet)?;

        for write in cells {
            let (row, col) = (write.cell.row, write.cell.col);
            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            let fields = &mut rows[row];
            if fields.len() <= col {
                fields.resize(col + 1, String::new());
            }
            fields[col] = write.value.clone();
        }

        write_csv_rows(&self.sheet_path(sheet), &rows, false)
            .map_err(|err| RemoteError::transport(err.to_string()))?;
        Ok(WriteReceipt::all(cells))
    }
}
