//! Environment variable source: ARCHIVIST prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add the environment overlay to a builder.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(source())
}

pub(crate) fn source() -> Environment {
    Environment::with_prefix("ARCHIVIST")
        .separator("__")
        .try_parsing(true)
}
