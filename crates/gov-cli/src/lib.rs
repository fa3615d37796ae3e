//! # gov-cli — The `govern` Command-Line Tool
//!
//! Thin front end over the library crates. Each subcommand lives in its
//! own module with a clap `Args` struct and a `run_*` function returning
//! the process exit code.
//!
//! ## Subcommands
//!
//! - `govern validate`: validate policy files or directories.
//! - `govern migrate`: migrate a policy document between schema versions.
//! - `govern evaluate`: evaluate resources against a set of policies.
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Every input passed |
//! | 1 | A policy was invalid or a resource was blocked |
//! | 2 | Operational failure (unreadable input, bad config, no migration path) |
//!
//! ```bash
//! govern validate policies/
//! govern migrate policies/s3.yaml --to v1.1.0 --output migrated.yaml
//! govern evaluate --policies policies/ --resources inventory.json
//! ```

pub mod config;
pub mod evaluate;
pub mod migrate;
pub mod validate;

pub use config::GovConfig;
