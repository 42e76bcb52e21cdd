//! Resolving the active key and its configuration block.

mod cache;
mod error;
mod options;

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

pub use error::OptionsError;
pub use options::ToggleOptions;

use self::cache::ConfigCache;
use crate::compiler::{self, ParserChain};
use crate::tree::{identifier, ConfigTree, IndifferentMap};
use crate::Error;

/// Environment-keyed configuration.
///
/// A config file holds one top-level block per key:
///
/// ```yaml
/// local:
///   database_host: localhost
/// remote:
///   database_host: <%= ENV['DATABASE_HOST'] %>
/// ```
///
/// The key comes from an explicit value or, failing that, from a compiled
/// key file. The config file is compiled lazily on first access and reused
/// until its path or parser chain changes. The key is never cached.
///
/// Lookups take `&mut self` because they may fill the cache. To share a
/// `Toggle` between threads, wrap it in a `Mutex`.
///
/// ## Example
///
/// ```no_run
/// use toggle::{Toggle, ToggleOptions};
///
/// let mut toggle = Toggle::new(
///     ToggleOptions::new()
///         .with_key_filepath("config/key.yml")
///         .with_config_filepath("config/config.yml"),
/// );
///
/// let host = toggle.get("database_host")?;
/// # Ok::<(), toggle::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Toggle {
    key: Option<String>,
    key_filepath: Option<PathBuf>,
    key_parsers: Option<ParserChain>,
    config_filepath: Option<PathBuf>,
    config_parsers: Option<ParserChain>,
    cache: ConfigCache,
}

impl Toggle {
    pub fn new(options: ToggleOptions) -> Self {
        Self {
            key: options.key.as_deref().map(normalize_key),
            key_filepath: options.key_filepath,
            key_parsers: options.key_parsers,
            config_filepath: options.config_filepath,
            config_parsers: options.config_parsers,
            cache: ConfigCache::default(),
        }
    }

    /// Returns the active key.
    ///
    /// An explicit key is returned as is and the key file is not read.
    /// Otherwise the key file is compiled on every call. Returns `None` when
    /// neither is configured or the key file is blank.
    pub fn key(&self) -> Result<Option<String>, Error> {
        if let Some(key) = &self.key {
            return Ok(Some(key.clone()));
        }
        let Some(path) = &self.key_filepath else {
            return Ok(None);
        };

        let compiled = compiler::compile(path, self.key_parsers.clone())?;
        match compiled {
            ConfigTree::Null => Ok(None),
            ConfigTree::String(s) if s.trim().is_empty() => Ok(None),
            ConfigTree::String(s) => Ok(Some(normalize_key(&s))),
            ConfigTree::Bool(_) | ConfigTree::Integer(_) | ConfigTree::Float(_) => {
                Ok(Some(compiled.to_string()))
            }
            ConfigTree::Sequence(_) | ConfigTree::Mapping(_) => {
                Err(Error::InvalidKey(path.clone()))
            }
        }
    }

    /// Sets the explicit key, e.g. `"local"` or `":local"`.
    pub fn set_key(&mut self, key: impl AsRef<str>) {
        self.key = Some(normalize_key(key.as_ref()));
    }

    /// Removes the explicit key so the key file is consulted again.
    pub fn clear_key(&mut self) {
        self.key = None;
    }

    pub fn key_filepath(&self) -> Option<&Path> {
        self.key_filepath.as_deref()
    }

    pub fn set_key_filepath(&mut self, path: impl AsRef<Path>) {
        self.key_filepath = Some(path.as_ref().to_path_buf());
    }

    pub fn key_parsers(&self) -> Option<&ParserChain> {
        self.key_parsers.as_ref()
    }

    pub fn set_key_parsers(&mut self, parsers: Option<ParserChain>) {
        self.key_parsers = parsers;
    }

    pub fn config_filepath(&self) -> Option<&Path> {
        self.config_filepath.as_deref()
    }

    /// Sets the config file path. A path different from the current one
    /// invalidates the cached configs; the file is not read until the next
    /// lookup.
    pub fn set_config_filepath(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if self.config_filepath.as_deref() != Some(path) {
            debug!(path = %path.display(), "config file path changed, invalidating cache");
            self.cache.invalidate();
        }
        self.config_filepath = Some(path.to_path_buf());
    }

    pub fn config_parsers(&self) -> Option<&ParserChain> {
        self.config_parsers.as_ref()
    }

    /// Sets the config parser chain, invalidating the cache if it changed.
    pub fn set_config_parsers(&mut self, parsers: Option<ParserChain>) {
        if self.config_parsers != parsers {
            debug!("config parser chain changed, invalidating cache");
            self.cache.invalidate();
        }
        self.config_parsers = parsers;
    }

    /// Returns every config block, keyed by name.
    ///
    /// The config file is compiled at most once per path; later calls return
    /// the cached mapping without touching the file system.
    pub fn configs(&mut self) -> Result<&IndifferentMap, Error> {
        if self.cache.is_valid() {
            trace!("config cache hit");
        }

        let path = self.config_filepath.as_deref();
        let parsers = &self.config_parsers;
        self.cache.get_or_try_insert_with(|| {
            let path = path.ok_or(Error::MissingConfigFilepath)?;
            debug!(path = %path.display(), "compiling configs");

            match compiler::compile(path, parsers.clone())? {
                ConfigTree::Mapping(configs) => Ok(configs),
                ConfigTree::Null => Ok(IndifferentMap::new()),
                ConfigTree::String(s) if s.is_empty() => Ok(IndifferentMap::new()),
                _ => Err(Error::ConfigNotMapping(path.to_path_buf())),
            }
        })
    }

    /// Top-level keys of the config file, in file order.
    pub fn keys(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.configs()?.keys().map(str::to_string).collect())
    }

    /// Returns the block for `key` without changing the active key.
    pub fn config_for(&mut self, key: &str) -> Result<Option<&ConfigTree>, Error> {
        Ok(self.configs()?.get(key))
    }

    /// Returns the block for the active key, or `None` if there is no key or
    /// the config file has no block for it.
    pub fn config(&mut self) -> Result<Option<&ConfigTree>, Error> {
        let key = self.key()?;
        let configs = self.configs()?;
        Ok(key.and_then(|key| configs.get(&key)))
    }

    /// Returns `attribute` from the active block.
    pub fn get(&mut self, attribute: &str) -> Result<Option<&ConfigTree>, Error> {
        Ok(self.config()?.and_then(|config| config.get(attribute)))
    }

    /// Temporarily switches to `key`.
    ///
    /// The previous explicit key, or its absence, is restored when the
    /// returned guard is dropped, including during unwinding.
    ///
    /// ```no_run
    /// # use toggle::{Toggle, ToggleOptions};
    /// # let mut toggle = Toggle::new(ToggleOptions::new().with_key("local"));
    /// {
    ///     let mut remote = toggle.using("remote");
    ///     let host = remote.get("database_host")?;
    /// }
    /// assert_eq!(toggle.key()?.as_deref(), Some("local"));
    /// # Ok::<(), toggle::Error>(())
    /// ```
    pub fn using(&mut self, key: impl AsRef<str>) -> Using<'_> {
        let previous = self.key.replace(normalize_key(key.as_ref()));
        Using {
            toggle: self,
            previous,
        }
    }

    /// Runs `f` with `key` active, then restores the previous key.
    pub fn scoped<R>(&mut self, key: impl AsRef<str>, f: impl FnOnce(&mut Toggle) -> R) -> R {
        let mut scope = self.using(key);
        f(&mut scope)
    }
}

impl From<ToggleOptions> for Toggle {
    fn from(options: ToggleOptions) -> Self {
        Self::new(options)
    }
}

/// Guard returned by [`Toggle::using`].
#[derive(Debug)]
#[must_use = "the previous key is restored as soon as the guard is dropped"]
pub struct Using<'a> {
    toggle: &'a mut Toggle,
    previous: Option<String>,
}

impl Deref for Using<'_> {
    type Target = Toggle;

    fn deref(&self) -> &Toggle {
        self.toggle
    }
}

impl DerefMut for Using<'_> {
    fn deref_mut(&mut self) -> &mut Toggle {
        self.toggle
    }
}

impl Drop for Using<'_> {
    fn drop(&mut self) {
        self.toggle.key = self.previous.take();
    }
}

fn normalize_key(key: &str) -> String {
    identifier(key).to_string()
}
