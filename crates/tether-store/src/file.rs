//! File-backed slot storage.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use tether_core::error::StorageError;
use tether_core::{Result, Slot, SlotStorage};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// On-disk layout of one tier.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredSlots {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<String> {
        match slot {
            Slot::Access => &mut self.access_token,
            Slot::Refresh => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Slot storage kept in a single JSON file.
///
/// Writes go to a temporary file that is renamed into place, so a reader
/// never sees half a pair. Read-modify-write cycles hold an advisory lock on
/// a sibling `.lock` file. On Unix the token file is created with mode 0600.
/// The file is removed once both slots are empty.
#[derive(Debug, Clone)]
pub struct FileSlots {
    path: PathBuf,
}

impl FileSlots {
    /// Store slots in the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn io_error(&self, err: std::io::Error) -> tether_core::Error {
        StorageError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
        .into()
    }

    fn open_lock(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(|e| self.io_error(e))
    }

    fn load(&self) -> Result<StoredSlots> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredSlots::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents).map_err(|e| {
            StorageError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn save(&self, slots: &StoredSlots) -> Result<()> {
        if slots.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(self.io_error(e)),
            };
        }

        let json = serde_json::to_string_pretty(slots).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut temp = options.open(&temp_path).map_err(|e| self.io_error(e))?;

        // A temp file left by an earlier crash keeps its old mode
        #[cfg(unix)]
        temp.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| self.io_error(e))?;

        temp.write_all(json.as_bytes())
            .and_then(|()| temp.sync_all())
            .map_err(|e| self.io_error(e))?;
        drop(temp);

        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;
        trace!(path = %self.path.display(), "Wrote token file");
        Ok(())
    }

    /// Run `f` while holding the exclusive lock.
    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.init()?;
        let lock = self.open_lock()?;
        lock.lock_exclusive().map_err(|e| self.io_error(e))?;

        let result = f();

        lock.unlock().map_err(|e| self.io_error(e))?;
        result
    }

    /// Run a read-modify-write cycle under the exclusive lock.
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoredSlots),
    {
        self.locked(|| {
            let mut slots = self.load()?;
            f(&mut slots);
            self.save(&slots)
        })
    }
}

impl SlotStorage for FileSlots {
    fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn get(&self, slot: Slot) -> Result<Option<String>> {
        let mut slots = self.load()?;
        Ok(slots.slot_mut(slot).take())
    }

    fn set(&self, slot: Slot, value: &str) -> Result<()> {
        debug!(%slot, path = %self.path.display(), "Storing token");
        self.update(|slots| *slots.slot_mut(slot) = Some(value.to_string()))
    }

    fn remove(&self, slot: Slot) -> Result<()> {
        self.update(|slots| *slots.slot_mut(slot) = None)
    }

    fn set_pair(&self, access: &str, refresh: &str) -> Result<()> {
        debug!(path = %self.path.display(), "Storing token pair");
        self.update(|slots| {
            slots.access_token = Some(access.to_string());
            slots.refresh_token = Some(refresh.to_string());
        })
    }

    /// Delete the token file without reading it, so an unparsable file
    /// can always be cleared. The `.lock` sibling stays: other processes may
    /// be queued on it.
    fn remove_all(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        debug!(path = %self.path.display(), "Removing token file");
        self.locked(|| match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        })
    }
}
