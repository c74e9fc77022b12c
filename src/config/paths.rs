//! Path management for SSA Vault
//!
//! ## Path Resolution Order
//!
//! 1. `SSA_VAULT_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/ssa-vault` or `~/.config/ssa-vault`
//! 3. Windows: `%APPDATA%\ssa-vault`

use std::path::PathBuf;

use crate::error::VaultError;
use crate::storage::RecordKind;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "SSA_VAULT_DATA_DIR";

/// Manages all paths used by SSA Vault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Resolve the base directory from the environment or platform defaults
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding all persisted records, one subdirectory per kind
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Directory for one record kind (`data/reports`, `data/config`, ...)
    pub fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.data_dir().join(kind.as_str())
    }

    /// Path to the non-secret settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    /// Ensure the base, data and per-kind directories exist
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create base directory: {}", e)))?;

        for kind in RecordKind::ALL {
            std::fs::create_dir_all(self.kind_dir(kind)).map_err(|e| {
                VaultError::Io(format!("Failed to create {} directory: {}", kind, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, VaultError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("ssa-vault"));
        }
    }
    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| VaultError::Config("Could not determine home directory".into()))?;
    Ok(dirs.home_dir().join(".config").join("ssa-vault"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, VaultError> {
    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| VaultError::Config("Could not determine APPDATA directory".into()))?;
    Ok(dirs.config_dir().join("ssa-vault"))
}
