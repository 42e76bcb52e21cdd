use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OptionsError {
    #[error("options file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read options file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse options file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to deserialize options: {0}")]
    DeserializeError(#[from] toml::de::Error),
}
