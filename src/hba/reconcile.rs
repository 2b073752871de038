//! Rule reconciliation.
//!
//! [`RuleReconciler`] applies a [`ReconcileRequest`] to the current file in
//! a single pass:
//!
//! 1. Resolve every entry into a rule. Entries that conflict with the
//!    top-level fields or fail validation are rejected individually.
//! 2. If `overwrite` is set and at least one entry resolved, start from an
//!    empty file.
//! 3. Apply the resolved entries in submission order: `present` replaces the
//!    rule with the same identity or appends, `absent` removes matches.
//!
//! The pass is changed when the rendered file differs from the input, and
//! failed when some entry was rejected and nothing changed.

use serde::Serialize;

use super::error::RuleError;
use super::file::HbaFile;
use super::request::{ReconcileRequest, RuleSpec, RuleState, RulesBehavior};
use super::rule::{Rule, RuleRecord};

/// Outcome for a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryResult {
    /// Whether this entry modified the file
    pub changed: bool,
    /// Whether this entry was rejected
    pub failed: bool,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl EntryResult {
    /// Creates the result of an applied entry.
    #[must_use]
    pub const fn applied(changed: bool) -> Self {
        Self {
            changed,
            failed: false,
            msg: None,
        }
    }

    /// Creates the result of a rejected entry.
    #[must_use]
    pub fn rejected(error: &RuleError) -> Self {
        Self {
            changed: false,
            failed: true,
            msg: Some(error.to_string()),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The file after reconciliation
    pub file: HbaFile,
    /// Whether the file content differs from the input
    pub changed: bool,
    /// Whether entries were rejected and nothing changed
    pub failed: bool,
    /// Combined failure messages when `failed` is set
    pub msg: Option<String>,
    /// One result per entry, in submission order
    pub results: Vec<EntryResult>,
}

impl Reconciliation {
    /// Returns the resulting rules in serialized form.
    #[must_use]
    pub fn records(&self) -> Vec<RuleRecord> {
        self.file.records()
    }
}

/// An entry that passed resolution.
#[derive(Debug)]
struct ResolvedEntry {
    rule: Rule,
    state: RuleState,
    clear_comment: bool,
}

/// Applies rule requests to a `pg_hba.conf` file.
#[derive(Debug, Clone, Copy)]
pub struct RuleReconciler<'a> {
    request: &'a ReconcileRequest,
}

impl<'a> RuleReconciler<'a> {
    /// Creates a reconciler for the given request.
    #[must_use]
    pub const fn new(request: &'a ReconcileRequest) -> Self {
        Self { request }
    }

    /// Runs one reconciliation pass against `current`.
    #[must_use]
    pub fn reconcile(&self, current: &HbaFile) -> Reconciliation {
        let resolved: Vec<Result<ResolvedEntry, RuleError>> = self
            .request
            .entries()
            .into_iter()
            .map(|entry| self.resolve(entry))
            .collect();

        let any_resolved = resolved.iter().any(Result::is_ok);
        let overwrite = self.request.overwrite && (any_resolved || resolved.is_empty());

        let mut file = if overwrite {
            tracing::debug!(
                "Overwrite requested, discarding {} existing lines",
                current.lines().len()
            );
            HbaFile::default()
        } else {
            current.clone()
        };

        let results: Vec<EntryResult> = resolved
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Ok(entry) => EntryResult::applied(apply(&mut file, entry, index)),
                Err(e) => {
                    tracing::warn!("Rule entry {index} rejected: {e}");
                    EntryResult::rejected(&e)
                }
            })
            .collect();

        let changed = file.render() != current.render();
        let failures: Vec<&str> = results.iter().filter_map(|r| r.msg.as_deref()).collect();
        let failed = !failures.is_empty() && !changed;
        let msg = failed.then(|| failures.join("; "));

        Reconciliation {
            file,
            changed,
            failed,
            msg,
            results,
        }
    }

    fn resolve(&self, entry: &RuleSpec) -> Result<ResolvedEntry, RuleError> {
        let merged = if self.request.is_list() {
            match self.request.rules_behavior {
                RulesBehavior::Conflict => {
                    entry.check_conflicts(&self.request.rule)?;
                    entry.clone()
                }
                RulesBehavior::Combine => entry.combined_with(&self.request.rule),
            }
        } else {
            entry.clone()
        };

        Ok(ResolvedEntry {
            rule: merged.to_rule()?,
            state: merged.state.unwrap_or(self.request.state),
            clear_comment: merged.clears_comment(),
        })
    }
}

fn apply(file: &mut HbaFile, entry: ResolvedEntry, index: usize) -> bool {
    let changed = match entry.state {
        RuleState::Present if entry.clear_comment => file.replace(entry.rule.clone()),
        RuleState::Present => file.upsert(entry.rule.clone()),
        RuleState::Absent => file.remove(&entry.rule.identity()),
    };
    tracing::debug!(
        "Rule entry {index} ({}) {}: {}",
        entry.state,
        if changed { "applied" } else { "already satisfied" },
        entry.rule
    );
    changed
}
