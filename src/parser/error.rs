use thiserror::Error;

use crate::template::TemplateError;

/// Failure while turning text into a [`ConfigTree`](crate::ConfigTree).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("template expansion failed: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// No parser is registered for the requested format.
#[derive(Debug, Error)]
#[error("{0} is not currently implemented. You should write it!")]
pub struct ParserNotFound(pub String);
