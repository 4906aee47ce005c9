//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("source chart path does not exist: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("output directory does not exist: {}", path.display())]
    OutputDirNotFound { path: PathBuf },

    #[error("invalid release name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("failed to create chart '{name}' from source")]
    Materialize {
        name: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("failed to read values file {}: {message}", path.display())]
    ValuesRead { path: PathBuf, message: String },

    #[error("failed to write values file {}: {message}", path.display())]
    ValuesWrite { path: PathBuf, message: String },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("unknown scale action '{0}', expected 'up' or 'down'")]
    UnknownScaleAction(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
