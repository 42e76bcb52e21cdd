use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::OptionsError;
use crate::compiler::ParserChain;

/// Construction options for a [`Toggle`](crate::Toggle).
///
/// Every field is optional. Unset parser chains are derived from the file
/// extension of the corresponding path.
///
/// Options can be assembled in code, read from a TOML file, and overlaid
/// with environment variables:
///
/// ```no_run
/// use toggle::{Toggle, ToggleOptions};
///
/// let options = ToggleOptions::from_toml_file("toggle.toml")?
///     .with_env("TOGGLE");
/// let mut toggle = Toggle::new(options);
/// # Ok::<(), toggle::Error>(())
/// ```
///
/// ```toml
/// key_filepath = "config/key.yml"
/// config_filepath = "config/config.yml"
/// config_parsers = "yml"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct ToggleOptions {
    /// Explicit key. Wins over `key_filepath`.
    pub key: Option<String>,
    pub key_filepath: Option<PathBuf>,
    pub key_parsers: Option<ParserChain>,
    pub config_filepath: Option<PathBuf>,
    pub config_parsers: Option<ParserChain>,
}

impl ToggleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_key_filepath(mut self, path: impl AsRef<Path>) -> Self {
        self.key_filepath = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_key_parsers(mut self, parsers: impl Into<ParserChain>) -> Self {
        self.key_parsers = Some(parsers.into());
        self
    }

    pub fn with_config_filepath(mut self, path: impl AsRef<Path>) -> Self {
        self.config_filepath = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_config_parsers(mut self, parsers: impl Into<ParserChain>) -> Self {
        self.config_parsers = Some(parsers.into());
        self
    }

    /// Parses options from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| OptionsError::ParseError {
                path: path.to_path_buf(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OptionsError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(OptionsError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Overrides fields from environment variables named `{prefix}_{FIELD}`,
    /// e.g. `TOGGLE_KEY` or `TOGGLE_CONFIG_FILEPATH`.
    ///
    /// Parser chains are comma-separated (`TOGGLE_CONFIG_PARSERS=yml`).
    /// Unset and empty variables leave the field untouched.
    pub fn with_env(self, prefix: &str) -> Self {
        self.with_vars(prefix, |name| std::env::var(name).ok())
    }

    fn with_vars(mut self, prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |field: &str| {
            lookup(&format!("{prefix}_{field}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(key) = var("KEY") {
            self.key = Some(key);
        }
        if let Some(path) = var("KEY_FILEPATH") {
            self.key_filepath = Some(path.into());
        }
        if let Some(parsers) = var("KEY_PARSERS") {
            self.key_parsers = Some(split_chain(&parsers));
        }
        if let Some(path) = var("CONFIG_FILEPATH") {
            self.config_filepath = Some(path.into());
        }
        if let Some(parsers) = var("CONFIG_PARSERS") {
            self.config_parsers = Some(split_chain(&parsers));
        }
        self
    }
}

fn split_chain(s: &str) -> ParserChain {
    ParserChain::new(
        s.split(',')
            .map(str::trim)
            .filter(|format| !format.is_empty()),
    )
}
