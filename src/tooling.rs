//! Tooling
//!
//! Command-line access to the import pipeline.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, ConfigCommands};
