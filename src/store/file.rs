//! File-based store implementation.

use std::fs::OpenOptions;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use super::{HbaStore, LoadResult, StoreError};

/// Backups taken within the same second get a counter; give up after this many.
const MAX_BACKUPS_PER_SECOND: u32 = 1000;

/// Returns the current Unix timestamp in seconds.
fn unix_timestamp_now() -> u64 {
    use std::time::SystemTime;

    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// File-based implementation of [`HbaStore`].
///
/// # Atomic Writes
///
/// Uses write-to-temp-then-rename pattern to prevent corruption:
/// 1. Write to `{path}.tmp`, copying the permissions of the existing file
/// 2. Rename `{path}.tmp` to `{path}`
///
/// This ensures the file is either fully written or not written at all.
#[derive(Debug, Clone)]
pub struct FileHbaStore {
    path: PathBuf,
}

impl FileHbaStore {
    /// Creates a store for the file at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        // Append rather than replace the extension (pg_hba.conf -> pg_hba.conf.tmp)
        PathBuf::from(format!("{}.tmp", self.path.display()))
    }

    fn backup_path(&self, timestamp: u64, attempt: u32) -> PathBuf {
        if attempt == 0 {
            PathBuf::from(format!("{}.{timestamp}.bak", self.path.display()))
        } else {
            PathBuf::from(format!("{}.{timestamp}.{attempt}.bak", self.path.display()))
        }
    }

    /// Moves a written temp file over the destination, keeping its permissions.
    fn replace_with(&self, temp_path: &Path) -> Result<(), StoreError> {
        if let Ok(metadata) = std::fs::metadata(&self.path) {
            std::fs::set_permissions(temp_path, metadata.permissions())
                .map_err(|e| self.write_error(e))?;
        }

        // Atomic rename (on most filesystems)
        std::fs::rename(temp_path, &self.path).map_err(|e| self.write_error(e))
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl HbaStore for FileHbaStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<LoadResult, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(LoadResult::Loaded(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LoadResult::NotFound),
            Err(e) => Err(StoreError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, content: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }

        let temp_path = self.temp_path();
        std::fs::write(&temp_path, content).map_err(|e| self.write_error(e))?;

        let result = self.replace_with(&temp_path);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        result
    }

    fn backup(&self) -> Result<PathBuf, StoreError> {
        let timestamp = unix_timestamp_now();

        for attempt in 0..MAX_BACKUPS_PER_SECOND {
            let backup_path = self.backup_path(timestamp, attempt);

            // Reserve the name first so an earlier backup is never overwritten
            match OpenOptions::new().write(true).create_new(true).open(&backup_path) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(backup_error(backup_path, e)),
            }

            return match std::fs::copy(&self.path, &backup_path) {
                Ok(_) => Ok(backup_path),
                Err(e) => {
                    let _ = std::fs::remove_file(&backup_path);
                    Err(backup_error(backup_path, e))
                }
            };
        }

        Err(backup_error(
            self.backup_path(timestamp, MAX_BACKUPS_PER_SECOND),
            io::Error::new(ErrorKind::AlreadyExists, "too many backups in one second"),
        ))
    }
}

fn backup_error(path: PathBuf, source: io::Error) -> StoreError {
    StoreError::Backup { path, source }
}
