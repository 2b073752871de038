//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::hba::{ReconcileRequest, RuleSpec, RuleState, RulesBehavior};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// Rule fields are not validated here: invalid rules are reported per entry
/// by the reconciler.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Path to the managed pg_hba.conf file (required)
    pub dest: PathBuf,

    /// Create the file if it does not exist
    pub create: bool,

    /// Back up the file before rewriting it
    pub backup: bool,

    /// Check mode (report changes without writing)
    pub check: bool,

    /// Include before/after content in the report
    pub diff: bool,

    /// What to reconcile
    pub request: ReconcileRequest,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .request
            .rules
            .as_ref()
            .map_or_else(|| "single".to_string(), |rules| rules.len().to_string());

        write!(
            f,
            "Config {{ dest: {}, create: {}, state: {}, overwrite: {}, rules_behavior: {}, \
             rules: {}, backup: {}, check: {} }}",
            self.dest.display(),
            self.create,
            self.request.state,
            self.request.overwrite,
            self.request.rules_behavior,
            entries,
            self.backup,
            self.check,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `dest` is missing
    /// - `state` or `rules_behavior` is not a known value
    /// - `[rule]` sets a state
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let dest = Self::resolve_dest(cli, toml)?;

        let state = Self::resolve_state(cli, toml)?;
        let rules_behavior = Self::resolve_rules_behavior(cli, toml)?;
        let rule = Self::resolve_rule(cli, toml)?;

        // Flags only enable: set in either source means true
        let create = cli.create || toml.is_some_and(|t| t.file.create);
        let backup = cli.backup || toml.is_some_and(|t| t.file.backup);
        let overwrite = cli.overwrite || toml.is_some_and(|t| t.reconcile.overwrite);

        let request = ReconcileRequest {
            state,
            overwrite,
            rules_behavior,
            rule,
            rules: toml.and_then(|t| t.rules.clone()),
        };

        Ok(Self {
            dest,
            create,
            backup,
            check: cli.check,
            diff: cli.diff,
            request,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional task file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The task file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_dest(cli: &Cli, toml: Option<&TomlConfig>) -> Result<PathBuf, ConfigError> {
        // CLI takes precedence
        if let Some(ref path) = cli.dest {
            return Ok(expand_tilde(path));
        }

        toml.and_then(|t| t.file.dest.as_deref())
            .map(|dest| expand_tilde(Path::new(dest)))
            .ok_or_else(|| {
                ConfigError::missing(field::DEST, "Use --dest or set file.dest in the task file")
            })
    }

    fn resolve_state(cli: &Cli, toml: Option<&TomlConfig>) -> Result<RuleState, ConfigError> {
        // Priority: CLI explicit > TOML > default
        if let Some(state) = cli.state {
            return Ok(state.into());
        }

        match toml.and_then(|t| t.reconcile.state.as_deref()) {
            Some(value) => parse_state(value),
            None => Ok(defaults::STATE),
        }
    }

    fn resolve_rules_behavior(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<RulesBehavior, ConfigError> {
        // Priority: CLI explicit > TOML > default
        if let Some(behavior) = cli.rules_behavior {
            return Ok(behavior.into());
        }

        match toml.and_then(|t| t.reconcile.rules_behavior.as_deref()) {
            Some(value) => parse_rules_behavior(value),
            None => Ok(defaults::RULES_BEHAVIOR),
        }
    }

    fn resolve_rule(cli: &Cli, toml: Option<&TomlConfig>) -> Result<RuleSpec, ConfigError> {
        let from_cli = cli.rule_spec();
        let Some(toml) = toml else {
            return Ok(from_cli);
        };

        if toml.rule.state.is_some() {
            return Err(ConfigError::Misplaced {
                field: field::RULE_STATE,
                hint: "set the state in the [reconcile] section or on a [[rules]] entry",
            });
        }

        // Each field: CLI explicit > TOML
        let from_toml = &toml.rule;
        Ok(RuleSpec {
            contype: from_cli.contype.or_else(|| from_toml.contype.clone()),
            databases: from_cli.databases.or_else(|| from_toml.databases.clone()),
            users: from_cli.users.or_else(|| from_toml.users.clone()),
            address: from_cli.address.or_else(|| from_toml.address.clone()),
            netmask: from_cli.netmask.or_else(|| from_toml.netmask.clone()),
            method: from_cli.method.or_else(|| from_toml.method.clone()),
            options: from_cli.options.or_else(|| from_toml.options.clone()),
            comment: from_cli.comment.or_else(|| from_toml.comment.clone()),
            state: None,
        })
    }
}

/// Writes the task file template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_task_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn parse_state(s: &str) -> Result<RuleState, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "present" => Ok(RuleState::Present),
        "absent" => Ok(RuleState::Absent),
        _ => Err(ConfigError::InvalidState {
            value: s.to_string(),
        }),
    }
}

fn parse_rules_behavior(s: &str) -> Result<RulesBehavior, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "conflict" => Ok(RulesBehavior::Conflict),
        "combine" => Ok(RulesBehavior::Combine),
        _ => Err(ConfigError::InvalidRulesBehavior {
            value: s.to_string(),
        }),
    }
}

/// Expands a leading `~` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}
