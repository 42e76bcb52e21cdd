//! The parsed configuration tree.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A parsed configuration value.
///
/// Every mapping in the tree is an [`IndifferentMap`], so keys can be looked
/// up as `"name"`, `":name"` or `"NAME"` at any depth.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigTree {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigTree>),
    Mapping(IndifferentMap),
}

impl ConfigTree {
    /// Looks up `key` if this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&ConfigTree> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Follows a sequence of mapping keys.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigTree> {
        path.iter()
            .try_fold(self, |current, segment| current.get(segment.as_ref()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigTree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigTree::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigTree::Integer(i) => Some(*i as f64),
            ConfigTree::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigTree::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigTree]> {
        match self {
            ConfigTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndifferentMap> {
        match self {
            ConfigTree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigTree::Null)
    }

    /// Returns `true` for values that end a compilation chain early:
    /// null and the empty string.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            ConfigTree::Null => true,
            ConfigTree::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Renders the tree as a YAML document.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl fmt::Display for ConfigTree {
    /// Scalars render bare; sequences and mappings render as inline YAML.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigTree::Null => Ok(()),
            ConfigTree::Bool(b) => write!(f, "{b}"),
            ConfigTree::Integer(i) => write!(f, "{i}"),
            ConfigTree::Float(v) => write!(f, "{v}"),
            ConfigTree::String(s) => f.write_str(s),
            ConfigTree::Sequence(_) | ConfigTree::Mapping(_) => {
                let yaml = self.to_yaml_string().map_err(|_| fmt::Error)?;
                f.write_str(yaml.trim_end())
            }
        }
    }
}

impl From<&str> for ConfigTree {
    fn from(value: &str) -> Self {
        ConfigTree::String(value.to_string())
    }
}

impl From<String> for ConfigTree {
    fn from(value: String) -> Self {
        ConfigTree::String(value)
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigTree::Null => serializer.serialize_unit(),
            ConfigTree::Bool(b) => serializer.serialize_bool(*b),
            ConfigTree::Integer(i) => serializer.serialize_i64(*i),
            ConfigTree::Float(f) => serializer.serialize_f64(*f),
            ConfigTree::String(s) => serializer.serialize_str(s),
            ConfigTree::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigTree::Mapping(map) => map.serialize(serializer),
        }
    }
}

/// An insertion-ordered mapping whose keys compare indifferently.
///
/// Keys are stored in canonical form (see [`canonical_key`]) and every lookup
/// canonicalises its argument the same way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndifferentMap {
    entries: Vec<(String, ConfigTree)>,
}

impl IndifferentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any entry whose key is equivalent.
    pub fn insert(&mut self, key: &str, value: ConfigTree) -> Option<ConfigTree> {
        let key = canonical_key(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigTree> {
        let key = canonical_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in the order they first appeared.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigTree)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>> FromIterator<(K, ConfigTree)> for IndifferentMap {
    fn from_iter<I: IntoIterator<Item = (K, ConfigTree)>>(iter: I) -> Self {
        let mut map = IndifferentMap::new();
        for (key, value) in iter {
            map.insert(key.as_ref(), value);
        }
        map
    }
}

impl Serialize for IndifferentMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Returns the name of a symbol-style identifier (`:name`), if `s` is one.
pub fn symbol_name(s: &str) -> Option<&str> {
    let name = s.strip_prefix(':')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    let valid = (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '?' || c == '!');
    valid.then_some(name)
}

/// Normalises a key or key name into an identifier: surrounding whitespace
/// and any symbol prefix are removed.
pub fn identifier(s: &str) -> &str {
    let s = s.trim();
    symbol_name(s).unwrap_or(s)
}

/// The form every mapping key is stored and compared in.
pub fn canonical_key(key: &str) -> String {
    identifier(key).to_lowercase()
}
