//! Application execution logic.
//!
//! One run reads the destination file, reconciles it with the requested
//! rules, and replaces the file when something changed.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use pg_hba::config::ValidatedConfig;
use pg_hba::hba::{EntryResult, HbaFile, RuleReconciler, RuleRecord};
use pg_hba::store::{FileHbaStore, HbaStore, LoadResult, StoreError};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The destination does not exist and may not be created.
    #[error("Destination '{}' does not exist; use --create to create it", path.display())]
    MissingDestination {
        /// Path of the destination file
        path: PathBuf,
    },

    /// Failed to read the destination file.
    #[error("Failed to load rules: {0}")]
    Load(#[source] StoreError),

    /// Failed to back up the destination file.
    #[error("Failed to back up rules: {0}")]
    Backup(#[source] StoreError),

    /// Failed to write the destination file.
    #[error("Failed to save rules: {0}")]
    Save(#[source] StoreError),
}

/// File content before and after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Content as read
    pub before: String,
    /// Content as written (or as it would be written in check mode)
    pub after: String,
}

/// Report printed after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Whether the file content changed
    pub changed: bool,
    /// Whether the run could not make any requested change
    pub failed: bool,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Resulting rules
    pub pg_hba: Vec<RuleRecord>,
    /// Per-entry results, for `[[rules]]` requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<EntryResult>>,
    /// Path of the backup taken before rewriting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<PathBuf>,
    /// Content before and after, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
}

impl Report {
    /// Creates the report for a run that stopped with an error.
    #[must_use]
    pub fn fatal(error: &RunError) -> Self {
        Self {
            changed: false,
            failed: true,
            msg: Some(error.to_string()),
            pg_hba: Vec::new(),
            results: None,
            backup_file: None,
            diff: None,
        }
    }
}

/// Executes one run against the configured destination file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, backed up, or written, or
/// if it does not exist and `create` is not set.
pub fn execute(config: &ValidatedConfig) -> Result<Report, RunError> {
    let store = FileHbaStore::new(&config.dest);
    execute_with(config, &store)
}

/// Executes one run against the given store.
///
/// This function:
/// 1. Loads the current file (an absent file is empty when `create` is set)
/// 2. Reconciles it with the configured request
/// 3. Backs up and rewrites the file if it changed, unless in check mode
///
/// # Errors
///
/// See [`execute`].
pub fn execute_with<S: HbaStore>(config: &ValidatedConfig, store: &S) -> Result<Report, RunError> {
    let loaded = store.load().map_err(RunError::Load)?;
    let existed = loaded.is_loaded();

    let before = match loaded {
        LoadResult::Loaded(content) => content,
        LoadResult::NotFound if config.create => {
            tracing::info!("{} does not exist and will be created", store.path().display());
            String::new()
        }
        LoadResult::NotFound => {
            return Err(RunError::MissingDestination {
                path: store.path().to_path_buf(),
            });
        }
    };

    let current = HbaFile::parse(&before);
    let outcome = RuleReconciler::new(&config.request).reconcile(&current);
    let after = outcome.file.render();

    let mut backup_file = None;
    if !outcome.changed {
        tracing::info!("{} is up to date", store.path().display());
    } else if config.check {
        tracing::info!("Check mode: {} would be changed", store.path().display());
    } else {
        if config.backup && existed {
            let path = store.backup().map_err(RunError::Backup)?;
            tracing::info!("Backed up to {}", path.display());
            backup_file = Some(path);
        }
        store.save(&after).map_err(RunError::Save)?;
        tracing::info!(
            "Wrote {} rules to {}",
            outcome.file.rule_count(),
            store.path().display()
        );
    }

    let pg_hba = outcome.records();
    let diff = config.diff.then(|| Diff { before, after });

    Ok(Report {
        changed: outcome.changed,
        failed: outcome.failed,
        msg: outcome.msg,
        pg_hba,
        results: config.request.is_list().then_some(outcome.results),
        backup_file,
        diff,
    })
}
