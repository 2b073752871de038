//! TOML task file parsing.
//!
//! Defines the structure of the task file with serde.

use std::path::Path;

use serde::Deserialize;

use crate::hba::RuleSpec;

use super::ConfigError;

/// Root structure of a TOML task file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Destination file section
    #[serde(default)]
    pub file: FileSection,

    /// Reconciliation options
    #[serde(default)]
    pub reconcile: ReconcileSection,

    /// Top-level rule fields (single rule, or defaults for `rules`)
    #[serde(default)]
    pub rule: RuleSpec,

    /// Explicit rule entries
    pub rules: Option<Vec<RuleSpec>>,
}

/// Destination file section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
    /// Path to the pg_hba.conf file
    pub dest: Option<String>,

    /// Create the file if it does not exist
    #[serde(default)]
    pub create: bool,

    /// Back up the file before rewriting it
    #[serde(default)]
    pub backup: bool,
}

/// Reconciliation options section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileSection {
    /// Rule state: "present" or "absent"
    pub state: Option<String>,

    /// Replace every existing rule
    #[serde(default)]
    pub overwrite: bool,

    /// Rules behavior: "conflict" or "combine"
    pub rules_behavior: Option<String>,
}

impl TomlConfig {
    /// Loads a task file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses a task file from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a task file template with comments.
#[must_use]
pub fn default_task_template() -> String {
    r#"# pg-hba task file

[file]
# Path to the pg_hba.conf file (required, can be overridden by --dest)
# dest = "/etc/postgresql/16/main/pg_hba.conf"

# Create the file if it does not exist
# create = false

# Copy the file to {dest}.{timestamp}.bak before rewriting it
# backup = false

[reconcile]
# Default state for every rule: "present" or "absent"
# state = "present"

# Replace every existing rule with the rules of this task
# overwrite = false

# How [rule] fields interact with [[rules]] entries:
#   "conflict" - an entry whose field disagrees with [rule] fails
#   "combine"  - [rule] fields fill the fields an entry leaves unset
# rules_behavior = "conflict"

[rule]
# Without [[rules]] these fields describe the single managed rule.
# With [[rules]] they act as defaults (see rules_behavior).
# contype = "host"
# databases = "all"
# users = "all"
# address = "samehost"
# netmask = "255.255.255.0"
# method = "md5"
# options = "clientcert=verify-full"
# comment = "managed by pg-hba"   # "" removes an existing comment

# [[rules]]
# contype = "local"
# users = "postgres"
# method = "peer"

# [[rules]]
# contype = "hostssl"
# databases = "app"
# users = "app_user"
# address = "10.0.0.0/8"
# method = "scram-sha-256"
# state = "present"
"#
    .to_string()
}
