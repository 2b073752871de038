//! `pg_hba.conf` rules and their reconciliation.
//!
//! This module provides:
//! - The rule model ([`Rule`], [`ConnType`], [`Source`], [`RuleRecord`])
//! - Partial rule requests ([`RuleSpec`], [`ReconcileRequest`])
//! - The line-oriented file model ([`HbaFile`])
//! - The reconciliation engine ([`RuleReconciler`])
//!
//! # Field Resolution
//!
//! Each field of a rule entry is resolved with the following priority
//! (highest to lowest):
//!
//! 1. **Entry fields** - Values set on the entry itself
//! 2. **Top-level fields** - Only under [`RulesBehavior::Combine`]
//! 3. **Built-in defaults** - See [`defaults`]
//!
//! Under [`RulesBehavior::Conflict`], a top-level field that disagrees with
//! the entry's value rejects the entry instead.

pub mod defaults;
mod error;
mod file;
mod reconcile;
mod request;
mod rule;

#[cfg(test)]
mod reconcile_tests;

pub use error::{RuleError, field};
pub use file::{HbaFile, HbaLine};
pub use reconcile::{EntryResult, Reconciliation, RuleReconciler};
pub use request::{ReconcileRequest, RuleSpec, RuleState, RulesBehavior};
pub use rule::{ConnType, Rule, RuleIdentity, RuleRecord, Source, SourceKey, normalize_list, parse_method};
