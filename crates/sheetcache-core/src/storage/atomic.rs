//! Atomic file replacement.
//!
//! - write to a temp file in the same directory (avoids cross-device renames)
//! - flush + `sync_all`
//! - rename into place with replace semantics
//!
//! The temp file is removed on every error path, and readers only ever see the
//! previous file or the complete new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare relative file names.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically replace `dest` with `contents`, creating parent directories if needed.
pub fn atomic_write(dest: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;

    // Best-effort: the file is already in place if this fails.
    let _ = sync_parent_dir(dest);
    Ok(())
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    File::open(parent_dir_or_dot(path))?.sync_all()
}
