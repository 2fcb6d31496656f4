use config::shared::LoaderConfig;
use config::{Environment, load_config, load_config_from_directory};
use std::path::Path;

use crate::error::{LoaderError, LoaderResult};

/// Loads and validates the loader configuration.
///
/// Files are read from `configuration_directory` when given, and from `./configuration`
/// otherwise.
pub fn load_loader_config(configuration_directory: Option<&Path>) -> LoaderResult<LoaderConfig> {
    let config = match configuration_directory {
        Some(directory) => {
            let environment = Environment::load().map_err(LoaderError::config)?;
            load_config_from_directory::<LoaderConfig>(directory, environment)
        }
        None => load_config::<LoaderConfig>(),
    }
    .map_err(LoaderError::config)?;

    config.validate().map_err(LoaderError::config)?;

    Ok(config)
}
