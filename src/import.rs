//! Import: from a deposit to an Import Job
//!
//! [`DiffEngine`] is the synchronous core. [`ImportJobGenerator`] gathers its inputs
//! from the deposit store, the METS source and the repository.

pub mod diff;
pub mod generator;
pub mod job;
pub mod slug;

use serde::{Deserialize, Serialize};

pub use diff::{DiffEngine, ImportTarget};
pub use generator::{DepositAudit, ImportIntent, ImportJobGenerator};
pub use job::{ImportItemError, ImportJob, ImportJobResult, ImportJobStatus, ImportJobSummary};
pub use slug::{validate_slug, DEFAULT_MAX_SLUG_LENGTH};

/// Import configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Upper bound on container and binary slugs
    #[serde(default = "default_max_slug_length")]
    pub max_slug_length: usize,

    /// Reuse the deposit's sidecar index when present
    #[serde(default = "default_true")]
    pub read_index: bool,

    /// Store a fresh index after enumerating the deposit
    #[serde(default = "default_true")]
    pub write_index: bool,
}

fn default_max_slug_length() -> usize {
    DEFAULT_MAX_SLUG_LENGTH
}

fn default_true() -> bool {
    true
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_slug_length: default_max_slug_length(),
            read_index: true,
            write_index: true,
        }
    }
}
