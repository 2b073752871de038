//! Configuration layer for pg-hba.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML task file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Task file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML task file** - Values from the task file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! `dest` has no default and must come from one of the two sources.
//!
//! Rule fields (`contype`, `databases`, ...) are merged field by field: a
//! field given on the command line replaces the same field of the `[rule]`
//! section, other `[rule]` fields are kept. The `[[rules]]` list can only be
//! given in a task file.
//!
//! # Boolean Flag Semantics
//!
//! Boolean flags (`--create`, `--overwrite`, `--backup`) use OR semantics:
//! - If set `true` in either CLI or TOML, the result is `true`.
//! - Once set `true` in TOML, CLI cannot override to `false` (flags only enable, not disable).
//!
//! `--check`, `--diff` and `--verbose` are CLI-only.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command, RulesBehaviorArg, StateArg};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_task_template};
pub use validated::{ValidatedConfig, write_default_config};
