//! Error types for hserr.
//!
//! Only I/O and configuration can fail. Anything odd inside a dump
//! (unknown lines, malformed fields, orphan continuations) is absorbed by
//! the model and reported as a finding instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HserrError {
    #[error("cannot read fatal error log {}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid release entry: {0}")]
    InvalidRelease(String),
}
