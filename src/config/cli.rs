//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::hba::{RuleSpec, RuleState, RulesBehavior};

use super::defaults;

/// pg-hba: PostgreSQL host-based authentication rule manager
///
/// Adds, replaces, or removes rules in a pg_hba.conf file and reports
/// the resulting rule set as JSON.
#[derive(Debug, Parser)]
#[command(name = "pg-hba")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the pg_hba.conf file to manage
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Create the file if it does not exist
    #[arg(long)]
    pub create: bool,

    /// Whether the rules should be present or absent
    #[arg(long, value_enum)]
    pub state: Option<StateArg>,

    /// Replace every existing rule with the rules of this run
    #[arg(long)]
    pub overwrite: bool,

    /// How top-level rule options interact with [[rules]] entries
    #[arg(long = "rules-behavior", value_enum)]
    pub rules_behavior: Option<RulesBehaviorArg>,

    /// Connection type (local, host, hostssl, hostnossl, hostgssenc, hostnogssenc)
    #[arg(long)]
    pub contype: Option<String>,

    /// Comma-separated database names
    #[arg(long)]
    pub databases: Option<String>,

    /// Comma-separated user names
    #[arg(long)]
    pub users: Option<String>,

    /// Client address: CIDR network, IP address, keyword, or host name
    #[arg(long, visible_aliases = ["source", "src"])]
    pub address: Option<String>,

    /// Netmask for a plain IP address
    #[arg(long)]
    pub netmask: Option<String>,

    /// Authentication method
    #[arg(long)]
    pub method: Option<String>,

    /// Authentication options (e.g. 'clientcert=verify-full')
    #[arg(long)]
    pub options: Option<String>,

    /// Inline comment written after the rule (an empty value removes it)
    #[arg(long)]
    pub comment: Option<String>,

    /// Back up the file before rewriting it
    #[arg(long)]
    pub backup: bool,

    /// Report what would change without writing the file
    #[arg(long)]
    pub check: bool,

    /// Include the file content before and after in the report
    #[arg(long)]
    pub diff: bool,

    /// Path to TOML task file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for pg-hba
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a task file template
    Init {
        /// Output path for the task file
        #[arg(long, short, default_value = defaults::TASK_FILE)]
        output: PathBuf,
    },
}

/// Rule state argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    /// Ensure the rules exist
    Present,
    /// Ensure the rules do not exist
    Absent,
}

impl From<StateArg> for RuleState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
        }
    }
}

/// Rules behavior argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RulesBehaviorArg {
    /// Fail entries whose fields disagree with top-level options
    Conflict,
    /// Fill unset entry fields from top-level options
    Combine,
}

impl From<RulesBehaviorArg> for RulesBehavior {
    fn from(arg: RulesBehaviorArg) -> Self {
        match arg {
            RulesBehaviorArg::Conflict => Self::Conflict,
            RulesBehaviorArg::Combine => Self::Combine,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }

    /// Returns the rule fields given on the command line.
    #[must_use]
    pub fn rule_spec(&self) -> RuleSpec {
        RuleSpec {
            contype: self.contype.clone(),
            databases: self.databases.clone(),
            users: self.users.clone(),
            address: self.address.clone(),
            netmask: self.netmask.clone(),
            method: self.method.clone(),
            options: self.options.clone(),
            comment: self.comment.clone(),
            state: None,
        }
    }
}
