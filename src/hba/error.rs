//! Error types for rule resolution and validation.

use thiserror::Error;

/// Error type for a single rule entry.
///
/// These errors are recovered per entry: the reconciler records them as a
/// failed result and continues with the remaining entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A rule entry and the top-level options disagree on a field.
    #[error("{field}: rule sets '{entry}' but the top-level option sets '{top_level}'")]
    Conflict {
        /// Name of the conflicting field
        field: &'static str,
        /// Value given by the rule entry
        entry: String,
        /// Value given by the top-level option
        top_level: String,
    },

    /// Two fields that cannot be used together were both supplied.
    #[error("{first} and {second} are mutually exclusive: {reason}")]
    MutuallyExclusive {
        /// First field name
        first: &'static str,
        /// Second field name
        second: &'static str,
        /// What made them collide
        reason: String,
    },

    /// A field without a built-in default was not supplied.
    #[error("missing required field: {field}")]
    Missing {
        /// Name of the missing field
        field: &'static str,
    },

    /// A field value is not acceptable.
    #[error("invalid {field} '{value}': {reason}")]
    Invalid {
        /// Name of the field
        field: &'static str,
        /// The rejected value
        value: String,
        /// Reason for rejection
        reason: String,
    },
}

/// Field names used in error messages and conflict detection.
pub mod field {
    /// Connection type (`local`, `host`, ...).
    pub const CONTYPE: &str = "contype";
    /// Database list.
    pub const DATABASES: &str = "databases";
    /// User list.
    pub const USERS: &str = "users";
    /// Client address.
    pub const ADDRESS: &str = "address";
    /// Netmask for a plain IP address.
    pub const NETMASK: &str = "netmask";
    /// Authentication method.
    pub const METHOD: &str = "method";
    /// Authentication options.
    pub const OPTIONS: &str = "options";
    /// Inline comment.
    pub const COMMENT: &str = "comment";
}

impl RuleError {
    /// Creates a `Missing` error for a required field.
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::Missing { field }
    }

    /// Creates an `Invalid` error for a field value.
    #[must_use]
    pub fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
