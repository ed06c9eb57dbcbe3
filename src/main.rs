//! sheetcache - inspect and sync local sheet caches

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use sheetcache_core::storage::{write_csv_content, write_csv_rows};
use sheetcache_core::{
    CacheConfig, Credential, CredentialPool, CsvMirror, Offline, RemoteSheets, SheetCacheError,
    SheetKey, SheetRegistry,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, SheetArgs};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CacheConfig::load_default().context("loading user config")?,
    };
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(dir) = &cli.keys_dir {
        config.keys_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Credentials from `keys_dir`. Neither CLI remote checks credentials, so a
/// missing or empty directory falls back to a single local placeholder.
fn load_pool(keys_dir: &Path) -> Result<CredentialPool> {
    match CredentialPool::from_dir(keys_dir) {
        Ok(pool) => Ok(pool),
        Err(SheetCacheError::FileNotFound(_) | SheetCacheError::NoCredentials(_)) => {
            tracing::info!(dir = %keys_dir.display(), "no credential files, using a local placeholder");
            Ok(CredentialPool::new(vec![Credential::new("local", "")])?)
        }
        Err(err) => Err(err.into()),
    }
}

fn open_registry(cli: &Cli, config: CacheConfig) -> Result<SheetRegistry> {
    let remote: Arc<dyn RemoteSheets> = match &cli.mirror {
        Some(dir) => Arc::new(CsvMirror::new(dir)),
        None => Arc::new(Offline),
    };
    let pool = load_pool(&config.keys_dir)?;
    let registry = SheetRegistry::new(config, Arc::new(pool), remote)?;
    Ok(registry)
}

fn sheet_key(args: &SheetArgs) -> SheetKey {
    SheetKey::new(&args.spreadsheet, &args.sheet)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if let Command::Keys = cli.command {
        let pool = CredentialPool::from_dir(&config.keys_dir)
            .with_context(|| format!("loading credentials from {}", config.keys_dir.display()))?;
        let status = pool.status();
        println!(
            "{} credentials: {} available, {} cooling, {} failed",
            status.total, status.available, status.cooling, status.failed
        );
        for id in &status.failed_ids {
            println!("failed: {id}");
        }
        return Ok(());
    }

    let registry = open_registry(&cli, config)?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Command::Keys => {}
        Command::Get { sheet, cell } => {
            let key = sheet_key(sheet);
            let value = registry
                .get_value(&key, cell)
                .with_context(|| format!("reading {cell} from {key}"))?;
            writeln!(stdout, "{}", value.unwrap_or_default())?;
        }
        Command::Set { sheet, cell, value } => {
            let key = sheet_key(sheet);
            registry
                .set_value(&key, cell, value.as_str())
                .with_context(|| format!("writing {cell} in {key}"))?;
        }
        Command::Range { sheet, range } => {
            let key = sheet_key(sheet);
            let rows = registry
                .get_range(&key, range)
                .with_context(|| format!("reading {range} from {key}"))?;
            write!(stdout, "{}", write_csv_content(&rows, false))?;
        }
        Command::Dirty { sheet } => {
            let key = sheet_key(sheet);
            for label in registry.dirty_labels(&key)? {
                writeln!(stdout, "{label}")?;
            }
        }
        Command::Flush { sheet, cells } => {
            let key = sheet_key(sheet);
            let result = if cells.is_empty() {
                registry.flush_dirty(&key)
            } else {
                let labels: Vec<&str> = cells.iter().map(String::as_str).collect();
                registry.flush(&key, &labels)
            };
            let result = result.with_context(|| format!("flushing {key}"))?;

            writeln!(
                stdout,
                "committed {}, failed {} (attempts: {}, credential: {})",
                result.committed.len(),
                result.failed.len(),
                result.attempts,
                result.credential.as_deref().unwrap_or("-")
            )?;
            for cell in &result.failed {
                writeln!(stdout, "not confirmed: {cell}")?;
            }
        }
        Command::Export {
            sheet,
            range,
            output,
        } => {
            let key = sheet_key(sheet);
            let rows = registry
                .get_range(&key, range)
                .with_context(|| format!("reading {range} from {key}"))?;
            write_csv_rows(output, &rows, true)
                .with_context(|| format!("writing {}", output.display()))?;
            writeln!(stdout, "exported {} rows to {}", rows.len(), output.display())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
