//! Application configuration for crmsync.
//!
//! User config lives at `~/.crmsync/crmsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::types::Category;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "crmsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".crmsync";

/// Default database file name inside the config directory.
const DATABASE_FILE_NAME: &str = "crm.db";

// ---------------------------------------------------------------------------
// Config structs (matching crmsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reconciler defaults.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file. Empty means `~/.crmsync/crm.db`.
    #[serde(default)]
    pub path: String,
}

/// `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Prefix stripped from source table names when deriving a source label.
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    /// Category given to new clients when the caller supplies none.
    #[serde(default)]
    pub default_category: Category,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_prefix: default_source_prefix(),
            default_category: Category::Others,
        }
    }
}

fn default_source_prefix() -> String {
    "bd_".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.crmsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CrmError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.crmsync/crmsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CrmError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CrmError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CrmError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| CrmError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CrmError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the database path: explicit override, then config, then the default location.
pub fn resolve_database_path(config: &AppConfig, overridden: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = overridden {
        return Ok(path.to_path_buf());
    }
    let configured = config.database.path.trim();
    if configured.is_empty() {
        return Ok(config_dir()?.join(DATABASE_FILE_NAME));
    }
    Ok(expand_home(configured))
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
