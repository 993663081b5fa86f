//! Configuration
//!
//! `ArchivistConfig` is composed from defaults, an optional TOML file and the
//! environment, lowest to highest precedence. Environment keys use the `ARCHIVIST`
//! prefix and `__` between nesting levels: `ARCHIVIST__IMPORT__MAX_SLUG_LENGTH=128`.

pub mod environment;
pub mod loader;

use crate::deposit::DepositLayout;
use crate::error::ImportError;
use crate::import::ImportSettings;
use crate::logging::LoggingConfig;
use crate::queue::QueueSettings;
use serde::{Deserialize, Serialize};

pub use loader::ConfigLoader;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivistConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub deposit: DepositLayout,

    #[serde(default)]
    pub import: ImportSettings,

    #[serde(default)]
    pub queue: QueueSettings,
}

impl ArchivistConfig {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ImportError> {
        toml::to_string_pretty(self)
            .map_err(|e| ImportError::ConfigError(format!("Failed to render config: {}", e)))
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.import.max_slug_length == 0 {
            return Err(ImportError::ConfigError(
                "import.max_slug_length must be greater than 0".to_string(),
            ));
        }
        if self.queue.capacity == 0 {
            return Err(ImportError::ConfigError(
                "queue.capacity must be greater than 0".to_string(),
            ));
        }
        if self.queue.retained_results == 0 {
            return Err(ImportError::ConfigError(
                "queue.retained_results must be greater than 0".to_string(),
            ));
        }
        let layout = &self.deposit;
        for (key, value) in [
            ("deposit.content_root", &layout.content_root),
            ("deposit.metadata_root", &layout.metadata_root),
            ("deposit.mets_file_name", &layout.mets_file_name),
            ("deposit.index_file_name", &layout.index_file_name),
        ] {
            if value.trim().is_empty() {
                return Err(ImportError::ConfigError(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}
