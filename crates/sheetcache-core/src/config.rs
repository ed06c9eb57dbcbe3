//! Cache configuration.
//!
//! Every recognized option is an explicit field with a documented default.
//! Values can be read from a TOML file; unknown keys are rejected.
//!
//! ```toml
//! cache_dir = ".sheetcache"
//! keys_dir = "keys"
//! max_retries = 3
//! backoff_base_ms = 1000
//! call_timeout_ms = 30000
//! persist_on_write = true
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SheetCacheError};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

pub const DEFAULT_CACHE_DIR: &str = ".sheetcache";
pub const DEFAULT_KEYS_DIR: &str = "keys";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding one cache file per sheet.
    pub cache_dir: PathBuf,
    /// Directory of `*.json` credential files.
    pub keys_dir: PathBuf,
    /// Rate-limited attempts per flush before giving up.
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Upper bound for a single remote call.
    pub call_timeout: Duration,
    /// Write the cache file after every local mutation.
    pub persist_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            keys_dir: PathBuf::from(DEFAULT_KEYS_DIR),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            persist_on_write: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cache_dir: Option<PathBuf>,
    keys_dir: Option<PathBuf>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
    call_timeout_ms: Option<u64>,
    persist_on_write: Option<bool>,
}

impl CacheConfig {
    /// Parse a TOML document, filling unspecified options with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|err| SheetCacheError::Config(err.to_string()))?;

        let defaults = CacheConfig::default();
        let config = CacheConfig {
            cache_dir: file.cache_dir.unwrap_or(defaults.cache_dir),
            keys_dir: file.keys_dir.unwrap_or(defaults.keys_dir),
            max_retries: file.max_retries.unwrap_or(defaults.max_retries),
            backoff_base: file
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
            call_timeout: file
                .call_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
            persist_on_write: file.persist_on_write.unwrap_or(defaults.persist_on_write),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative directories are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SheetCacheError::FileNotFound(path.to_path_buf()));
        }
        let meta = std::fs::metadata(path)?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            return Err(SheetCacheError::Config(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if config.cache_dir.is_relative() {
                config.cache_dir = base.join(&config.cache_dir);
            }
            if config.keys_dir.is_relative() {
                config.keys_dir = base.join(&config.keys_dir);
            }
        }
        Ok(config)
    }

    /// Load the user config file if present, defaults otherwise.
    pub fn load_default() -> Result<Self> {
        match user_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(SheetCacheError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(SheetCacheError::Config(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(SheetCacheError::Config("cache_dir is empty".to_string()));
        }
        if self.keys_dir.as_os_str().is_empty() {
            return Err(SheetCacheError::Config("keys_dir is empty".to_string()));
        }
        Ok(())
    }
}

/// `config.toml` in the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetcache")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
