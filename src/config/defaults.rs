//! Default values for configuration options.
//!
//! Built-in values for rule fields live in [`crate::hba::defaults`].

use crate::hba::{RuleState, RulesBehavior};

/// Default path written by the `init` subcommand.
pub const TASK_FILE: &str = "pg-hba.toml";

/// Default rule state.
pub const STATE: RuleState = RuleState::Present;

/// Default rules behavior.
pub const RULES_BEHAVIOR: RulesBehavior = RulesBehavior::Conflict;
