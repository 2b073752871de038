//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the task file.
    #[error("Failed to read task file '{}': {source}", path.display())]
    FileRead {
        /// Path to the task file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML task file.
    #[error("Failed to parse TOML task file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write the task file (for init command).
    #[error("Failed to write task file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the task file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Missing required field that must be provided by CLI or task file.
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired {
        /// Name of the missing field
        field: &'static str,
        /// Hint for how to provide the value
        hint: &'static str,
    },

    /// Invalid state value.
    #[error("Invalid state '{value}': expected present or absent")]
    InvalidState {
        /// The invalid value provided
        value: String,
    },

    /// Invalid rules behavior value.
    #[error("Invalid rules_behavior '{value}': expected conflict or combine")]
    InvalidRulesBehavior {
        /// The invalid value provided
        value: String,
    },

    /// A field was set where it is not accepted.
    #[error("Field {field} is not accepted here: {hint}")]
    Misplaced {
        /// Name of the field
        field: &'static str,
        /// Where to set it instead
        hint: &'static str,
    },
}

/// Well-known field names for `MissingRequired` errors.
///
/// Use these constants for compile-time safety when matching field names.
pub mod field {
    /// The destination file field.
    pub const DEST: &str = "dest";
    /// The state set inside the `[rule]` section.
    pub const RULE_STATE: &str = "rule.state";
}

impl ConfigError {
    /// Creates a `MissingRequired` error for a required field.
    #[must_use]
    pub const fn missing(field: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { field, hint }
    }
}
