//! Errors raised while loading `hearth.json5` layers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{origin} is not valid JSON5: {source}")]
    Parse {
        origin: String,
        source: json5::Error,
    },
    /// The merged document does not fit the config model.
    #[error("config does not match the expected shape: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field is present but unusable; `path` names the layer and key.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }
}
