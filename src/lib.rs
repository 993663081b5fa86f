//! Archivist: Deposit Reconciliation and Import Jobs
//!
//! Reconciles a deposit's working tree with its METS description and computes the
//! change set (an import job) that brings a preserved archival group in line with
//! the deposit. Jobs are queued and applied through a repository writer.

pub mod combined;
pub mod config;
pub mod content_type;
pub mod deposit;
pub mod error;
pub mod import;
pub mod logging;
pub mod metadata;
pub mod mets;
pub mod preserved;
pub mod queue;
pub mod tooling;
pub mod types;
pub mod working;
