use std::path::PathBuf;

use crate::compiler::CompileError;
use crate::resolver::OptionsError;
use thiserror::Error;

/// Top-level error type for the toggle library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Compile(#[from] CompileError),

    #[error("invalid toggle options: {0}")]
    Options(#[from] OptionsError),

    #[error("no config file path has been set")]
    MissingConfigFilepath,

    #[error("config file '{0}' must contain a mapping of keys to config blocks")]
    ConfigNotMapping(PathBuf),

    #[error("key file '{0}' must contain a single key name")]
    InvalidKey(PathBuf),
}

impl Error {
    /// Returns `true` if a config or key file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Compile(e) if e.is_not_found())
    }
}
