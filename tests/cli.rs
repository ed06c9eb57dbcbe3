//! Integration tests for the sheetcache binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A config file, two credential files and a CSV mirror with one sheet.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("config.toml"),
            "cache_dir = \"cache\"\nkeys_dir = \"keys\"\nbackoff_base_ms = 1\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("keys")).unwrap();
        fs::write(root.join("keys/service-a.json"), "{}").unwrap();
        fs::write(root.join("keys/service-b.json"), "{}").unwrap();
        fs::create_dir_all(root.join("mirror/doc")).unwrap();
        fs::write(root.join("mirror/doc/Sheet1.csv"), "Name,Price\nWidget,9.99\n").unwrap();
        Workspace { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn run(&self, args: &[&str]) -> (String, String, i32) {
        self.run_with(Some(&self.path("mirror")), args)
    }

    fn run_offline(&self, args: &[&str]) -> (String, String, i32) {
        self.run_with(None, args)
    }

    fn run_with(&self, mirror: Option<&Path>, args: &[&str]) -> (String, String, i32) {
        let mut command = Command::new(env!("CARGO_BIN_EXE_sheetcache"));
        command.arg("--config").arg(self.path("config.toml"));
        if let Some(mirror) = mirror {
            command.arg("--mirror").arg(mirror);
        }
        let output = command
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute sheetcache");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);
        (stdout, stderr, exit_code)
    }
}

#[test]
fn test_get_fetches_from_mirror() {
    let ws = Workspace::new();
    let (stdout, _, code) = ws.run(&["get", "doc", "Sheet1", "B2"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "9.99");
    assert!(ws.path("cache/doc_Sheet1.cache").is_file());
}

#[test]
fn test_set_dirty_flush_cycle() {
    let ws = Workspace::new();

    let (_, _, code) = ws.run(&["set", "doc", "Sheet1", "B2", "12.50"]);
    assert_eq!(code, 0);

    let (stdout, _, _) = ws.run(&["dirty", "doc", "Sheet1"]);
    assert_eq!(stdout.trim(), "B2");

    let (stdout, stderr, code) = ws.run(&["flush", "doc", "Sheet1"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.starts_with("committed 1, failed 0"));

    let mirrored = fs::read_to_string(ws.path("mirror/doc/Sheet1.csv")).unwrap();
    assert_eq!(mirrored, "Name,Price\nWidget,12.50\n");

    let (stdout, _, _) = ws.run(&["dirty", "doc", "Sheet1"]);
    assert_eq!(stdout.trim(), "");
}

#[test]
fn test_flush_named_cells_only() {
    let ws = Workspace::new();
    ws.run(&["set", "doc", "Sheet1", "A3", "Gadget"]);
    ws.run(&["set", "doc", "Sheet1", "B3", "4.25"]);

    let (stdout, _, code) = ws.run(&["flush", "doc", "Sheet1", "a3"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("committed 1, failed 0"));

    let (stdout, _, _) = ws.run(&["dirty", "doc", "Sheet1"]);
    assert_eq!(stdout.trim(), "B3");
}

#[test]
fn test_range_prints_csv() {
    let ws = Workspace::new();
    let (stdout, _, code) = ws.run(&["range", "doc", "Sheet1", "A:B"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "Name,Price\nWidget,9.99\n");

    let (stdout, _, _) = ws.run(&["range", "doc", "Sheet1", "B1:C2"]);
    assert_eq!(stdout, "Price,\n9.99,\n");
}

#[test]
fn test_export_guards_formulas() {
    let ws = Workspace::new();
    ws.run(&["set", "doc", "Sheet1", "C1", "=1+2"]);

    let out = ws.path("export.csv");
    let (stdout, _, code) = ws.run(&[
        "export",
        "doc",
        "Sheet1",
        "A1:C1",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("exported 1 rows"));
    assert_eq!(fs::read_to_string(&out).unwrap(), "Name,Price,'=1+2\n");
}

#[test]
fn test_offline_reads_existing_cache() {
    let ws = Workspace::new();
    ws.run(&["get", "doc", "Sheet1", "A1"]);

    let (stdout, _, code) = ws.run_offline(&["get", "doc", "Sheet1", "A2"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Widget");
}

#[test]
fn test_offline_without_cache_fails() {
    let ws = Workspace::new();
    let (_, stderr, code) = ws.run_offline(&["get", "doc", "Sheet1", "A1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no remote configured"), "stderr: {stderr}");
}

#[test]
fn test_missing_remote_sheet_fails() {
    let ws = Workspace::new();
    let (_, stderr, code) = ws.run(&["get", "doc", "Missing", "A1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("404"), "stderr: {stderr}");
}

#[test]
fn test_invalid_label() {
    let ws = Workspace::new();
    let (_, stderr, code) = ws.run(&["get", "doc", "Sheet1", "1A"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid cell label"), "stderr: {stderr}");
}

#[test]
fn test_keys_status() {
    let ws = Workspace::new();
    let (stdout, _, code) = ws.run(&["keys"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "2 credentials: 2 available, 0 cooling, 0 failed");
}

#[test]
fn test_unknown_config_key_fails() {
    let ws = Workspace::new();
    fs::write(ws.path("config.toml"), "retries = 3\n").unwrap();
    let (_, stderr, code) = ws.run(&["keys"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid configuration"), "stderr: {stderr}");
}
