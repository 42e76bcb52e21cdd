use std::path::PathBuf;
use thiserror::Error;

use crate::parser::{Format, ParseError, ParserNotFound};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error("file not found: {path}: {source}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    ParserNotFound(#[from] ParserNotFound),

    #[error("failed to parse '{path}' as {format}: {source}")]
    Parse {
        path: PathBuf,
        format: Format,
        source: ParseError,
    },

    #[error("cannot apply the {format} parser to '{path}': the previous stage produced structured data")]
    NotText { path: PathBuf, format: Format },
}

impl CompileError {
    /// Returns `true` if the file being compiled does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CompileError::FileNotFound { .. })
    }
}
