use serde_yaml::Value;

use super::{ParseError, Parser};
use crate::template;
use crate::tree::{symbol_name, ConfigTree, IndifferentMap};

/// Expands template tags, then loads the result as YAML.
///
/// Symbol-style scalars (`:name`) are stored as the plain identifier `name`,
/// both as mapping keys and as values.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl Parser for YamlParser {
    fn parse(&self, content: &str) -> Result<ConfigTree, ParseError> {
        let expanded = template::expand(content)?;
        let expanded = chomp(&expanded);
        if expanded.trim().is_empty() {
            return Ok(ConfigTree::Null);
        }

        let value: Value = serde_yaml::from_str(expanded)?;
        Ok(into_tree(value))
    }
}

/// Strips a single trailing line terminator.
pub(crate) fn chomp(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .or_else(|| s.strip_suffix('\r'))
        .unwrap_or(s)
}

fn into_tree(value: Value) -> ConfigTree {
    match value {
        Value::Null => ConfigTree::Null,
        Value::Bool(b) => ConfigTree::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigTree::Integer(i),
            None => ConfigTree::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => match symbol_name(&s) {
            Some(name) => ConfigTree::String(name.to_string()),
            None => ConfigTree::String(s),
        },
        Value::Sequence(items) => ConfigTree::Sequence(items.into_iter().map(into_tree).collect()),
        Value::Mapping(mapping) => ConfigTree::Mapping(
            mapping
                .into_iter()
                .map(|(key, value)| (key_name(key), into_tree(value)))
                .collect::<IndifferentMap>(),
        ),
        Value::Tagged(tagged) => into_tree(tagged.value),
    }
}

fn key_name(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Tagged(tagged) => key_name(tagged.value),
        complex => serde_yaml::to_string(&complex)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
