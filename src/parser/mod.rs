//! Content parsers and the registry that selects them by format name.

mod error;
mod yaml;

use std::fmt;
use std::str::FromStr;

pub use error::{ParseError, ParserNotFound};
pub use yaml::YamlParser;
pub(crate) use yaml::chomp;

use crate::tree::{identifier, ConfigTree};

/// A single stage of a compilation chain.
pub trait Parser: Send + Sync + fmt::Debug {
    fn parse(&self, content: &str) -> Result<ConfigTree, ParseError>;
}

/// Formats with a registered parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Format {
    Yaml,
}

impl Format {
    /// Returns the shared parser instance for this format.
    pub fn parser(self) -> &'static dyn Parser {
        static YAML: YamlParser = YamlParser;
        match self {
            Format::Yaml => &YAML,
        }
    }
}

impl FromStr for Format {
    type Err = ParserNotFound;

    /// Format names are case-insensitive and may be written symbol-style
    /// (`:yml`).
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match identifier(name).to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(ParserNotFound(name.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => f.write_str("yaml"),
        }
    }
}

/// Looks up the parser registered for `format`.
pub fn for_format(format: &str) -> Result<&'static dyn Parser, ParserNotFound> {
    Ok(format.parse::<Format>()?.parser())
}
