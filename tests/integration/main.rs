//! Integration tests for deposit reconciliation and import jobs

mod support;

mod cli_commands;
mod deposit_import;
mod diff_properties;
mod mismatch_reports;
