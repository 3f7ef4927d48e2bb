use std::path::PathBuf;

use pulse_core::BusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    /// `mount` was called on a component that already has a target
    #[error("component `{name}` is already mounted")]
    AlreadyMounted { name: String },

    #[error("component `{name}` has been unmounted")]
    Disposed { name: String },

    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse runtime config: {0}")]
    Parse(#[from] toml::de::Error),
}
