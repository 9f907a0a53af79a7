//! converge-cli
//!
//! Command-line front end: loads a manifest, wires the reconciler to the
//! sandbox provider, and renders reports.
//!
//! Public API:
//! - `commands::plan()` / `apply()` / `destroy()` / `status()`: one per subcommand
//! - `config`: versioned on-disk configuration with migrations
//! - `output`: text and JSON rendering of reports

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
