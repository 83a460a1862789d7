//! Token file locations.
//!
//! The persistent tier lives in the data directory and survives reboots. The
//! ephemeral tier lives in the per-login runtime directory, which the OS
//! empties when the user's login session ends; systems without one fall
//! back to the cache directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use tether_store::{FileSlots, TieredStore};

const TOKEN_FILE: &str = "tokens.json";

/// Resolved token file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPaths {
    pub persistent: PathBuf,
    pub ephemeral: PathBuf,
}

impl TokenPaths {
    pub fn resolve() -> Result<Self> {
        let dirs =
            ProjectDirs::from("", "", "tether").context("Could not determine data directory")?;

        let ephemeral_dir = dirs
            .runtime_dir()
            .unwrap_or_else(|| dirs.cache_dir())
            .to_path_buf();

        Ok(Self {
            persistent: dirs.data_dir().join(TOKEN_FILE),
            ephemeral: ephemeral_dir.join(TOKEN_FILE),
        })
    }
}

/// Open the two-tier file store at the default locations.
pub fn open_store() -> Result<TieredStore<FileSlots, FileSlots>> {
    let paths = TokenPaths::resolve()?;
    tracing::debug!(
        persistent = %paths.persistent.display(),
        ephemeral = %paths.ephemeral.display(),
        "Token storage"
    );
    Ok(TieredStore::on_disk(&paths.persistent, &paths.ephemeral))
}
