//! pg-hba: PostgreSQL host-based authentication rule manager
//!
//! A library for reconciling the rules of a `pg_hba.conf` file with
//! declarative rule specifications, and persisting the result atomically.

pub mod config;
pub mod hba;
pub mod store;
