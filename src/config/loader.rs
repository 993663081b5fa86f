//! ConfigLoader: composes defaults, file and environment into `ArchivistConfig`.

use super::environment;
use super::ArchivistConfig;
use crate::error::ImportError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// User config file (`<config dir>/archivist/config.toml`), if the platform has one
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "archivist", "archivist")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` if given, else from the user config file when it exists.
    /// Precedence: defaults (lowest), file, environment (highest).
    pub fn load(path: Option<&Path>) -> Result<ArchivistConfig, ImportError> {
        let builder = Self::builder_with_defaults()?;
        let builder = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
            }
            None => match Self::default_config_path() {
                Some(path) => {
                    builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
                }
                None => builder,
            },
        };
        Self::finish(environment::add_to_builder(builder))
    }

    /// Load from TOML text plus the environment. Used by tests and embedding callers.
    pub fn load_from_str(toml: &str) -> Result<ArchivistConfig, ImportError> {
        let builder = Self::builder_with_defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(environment::add_to_builder(builder))
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ImportError> {
        let defaults = Config::try_from(&ArchivistConfig::default())?;
        Ok(Config::builder().add_source(defaults))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<ArchivistConfig, ImportError> {
        let config: ArchivistConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
