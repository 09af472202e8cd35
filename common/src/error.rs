use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration for extension '{extension}': {source}")]
    Extension {
        extension: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Connection '{0}' is already registered")]
    AlreadyRegistered(String),
}
