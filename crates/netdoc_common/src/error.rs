//! Error types for netdoc
//!
//! Only configuration loading can fail with an error. Command and probe
//! failures are data (`CommandResult`, `Outcome`), never `Err`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetdocError {
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, NetdocError>;
