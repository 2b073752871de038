//! Persistence of the managed `pg_hba.conf` file.
//!
//! This module provides an abstraction for reading the current file,
//! replacing it atomically, and taking a backup copy before a rewrite.

mod file;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::FileHbaStore;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result of loading the destination file.
///
/// A missing file is not an error here: whether it may be created is the
/// caller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// The file exists and was read.
    Loaded(String),

    /// The file does not exist.
    NotFound,
}

impl LoadResult {
    /// Returns the file content, or `None` for `NotFound`.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Loaded(content) => Some(content),
            Self::NotFound => None,
        }
    }

    /// Returns `true` if the file was read.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Errors that can occur while accessing the destination file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read the file.
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to write or replace the file.
    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to copy the file to its backup location.
    #[error("Failed to back up to '{}': {source}", path.display())]
    Backup {
        /// Backup path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Abstraction over the storage of the managed file.
///
/// Implementations should:
/// - Report a missing file as `LoadResult::NotFound`
/// - Replace the file atomically on save (write to temp file, then rename)
pub trait HbaStore {
    /// Returns the path of the managed file.
    fn path(&self) -> &Path;

    /// Reads the current content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn load(&self) -> Result<LoadResult, StoreError>;

    /// Replaces the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the new content cannot be written.
    fn save(&self, content: &str) -> Result<(), StoreError>;

    /// Copies the current file to a backup location and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn backup(&self) -> Result<PathBuf, StoreError>;
}
