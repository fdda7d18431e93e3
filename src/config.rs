//! Application configuration
//!
//! The config file is JSON. Every field has a default, so an empty object
//! (or no file at all) is a valid configuration.

use crate::core::error::Result;
use crate::core::index::BuildLimits;
use crate::utils::get_config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "FWGATE_CONFIG";

/// Default upper bound on rules in a single rule source
pub const DEFAULT_MAX_RULES: usize = 10_000;

/// Default upper bound on index entries after port expansion
pub const DEFAULT_MAX_ENTRIES: usize = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Rule source used when `--rules` is not given
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    /// Rule sources with more rows than this are refused
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    /// Rule sources whose port ranges expand past this many entries are refused
    ///
    /// Each rule is stored once per port it covers, so a single `1-65535` row
    /// costs 65535 entries. This is what bounds load time and memory.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Log level when no `-v` flag is given (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            max_rules: default_max_rules(),
            max_entries: default_max_entries(),
            log_level: default_log_level(),
        }
    }
}

fn default_max_rules() -> usize {
    DEFAULT_MAX_RULES
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Index build limits taken from this config
    pub fn limits(&self) -> BuildLimits {
        BuildLimits {
            max_rules: self.max_rules,
            max_entries: self.max_entries,
        }
    }
}

/// Path of the config file in the user's config directory.
pub fn default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.json"))
}

/// Loads the config.
///
/// Lookup order: `explicit`, then `$FWGATE_CONFIG`, then the default path.
/// A missing file at the default path yields [`AppConfig::default`]; a missing
/// file that was asked for by name is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    if let Some(path) = requested {
        return read_config(&path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => read_config(&path),
        _ => Ok(AppConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&json)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Saves the config using an atomic write pattern.
/// 1. Writes to a temporary file next to the target.
/// 2. Flushes it to disk.
/// 3. Atomically renames it over the target path.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    std::fs::rename(temp_path, path)?;
    Ok(())
}
