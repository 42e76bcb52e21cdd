//! Reading a file and threading its content through a chain of parsers.

mod error;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

pub use error::CompileError;

use crate::parser::{chomp, Format};
use crate::tree::ConfigTree;

/// Ordered list of format names applied to a file's content.
///
/// When no chain is given explicitly it is derived from the file name:
/// `config.yml` compiles with `["yml"]`, a name without extensions compiles
/// with an empty chain and yields the raw content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct ParserChain(Vec<String>);

impl ParserChain {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(formats.into_iter().map(Into::into).collect())
    }

    /// Derives the chain from every dot-separated extension of the file name,
    /// left to right.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        Self(
            name.split('.')
                .skip(1)
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn formats(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParserChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for ParserChain {
    fn from(format: &str) -> Self {
        Self(vec![format.to_string()])
    }
}

impl From<String> for ParserChain {
    fn from(format: String) -> Self {
        Self(vec![format])
    }
}

impl From<Vec<String>> for ParserChain {
    fn from(formats: Vec<String>) -> Self {
        Self(formats)
    }
}

impl From<&[&str]> for ParserChain {
    fn from(formats: &[&str]) -> Self {
        Self::new(formats.iter().copied())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for ParserChain {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(format) => format.into(),
            OneOrMany::Many(formats) => formats.into(),
        }
    }
}

/// Compiles a single file.
#[derive(Debug, Clone)]
pub struct Compiler {
    path: PathBuf,
    chain: ParserChain,
}

impl Compiler {
    /// Creates a compiler for `path`.
    ///
    /// An explicit `chain` takes precedence over the one derived from the
    /// file name.
    pub fn new(path: impl AsRef<Path>, chain: Option<ParserChain>) -> Self {
        let path = path.as_ref().to_path_buf();
        let chain = chain.unwrap_or_else(|| ParserChain::from_path(&path));
        Self { path, chain }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chain(&self) -> &ParserChain {
        &self.chain
    }

    /// Reads the file and folds its content through the parser chain.
    ///
    /// Each format name is resolved when its stage runs, so a missing file
    /// is reported before an unknown format.
    ///
    /// With an empty chain the raw content comes back as a
    /// [`ConfigTree::String`]. A blank intermediate result (empty text or
    /// null) stops the fold and is returned as is.
    pub fn compile(&self) -> Result<ConfigTree, CompileError> {
        debug!(path = %self.path.display(), chain = %self.chain, "compiling file");

        let mut content = ConfigTree::String(read_content(&self.path)?);
        for name in self.chain.formats() {
            if content.is_blank() {
                debug!(path = %self.path.display(), format = %name, "blank content, stopping parser chain");
                break;
            }

            let format = name.parse::<Format>()?;

            let ConfigTree::String(text) = &content else {
                return Err(CompileError::NotText {
                    path: self.path.clone(),
                    format,
                });
            };

            content = format
                .parser()
                .parse(text)
                .map_err(|source| CompileError::Parse {
                    path: self.path.clone(),
                    format,
                    source,
                })?;
        }

        Ok(content)
    }
}

/// Compiles `path` with an optional explicit chain.
pub fn compile(
    path: impl AsRef<Path>,
    chain: Option<ParserChain>,
) -> Result<ConfigTree, CompileError> {
    Compiler::new(path, chain).compile()
}

/// Reads a file as text, dropping one trailing line terminator.
pub fn read_content(path: &Path) -> Result<String, CompileError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(chomp(&contents).to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CompileError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) => Err(CompileError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_chain_from_path() {
        let chain = |p: &str| ParserChain::from_path(Path::new(p));

        assert_eq!(chain("config/config.yml").formats(), ["yml"]);
        assert_eq!(chain("config.yml.erb").formats(), ["yml", "erb"]);
        assert_eq!(chain("/etc/flat-key-local").formats(), [] as [&str; 0]);
        assert_eq!(chain("dir.d/key").formats(), [] as [&str; 0]);
    }

    #[test]
    fn test_explicit_chain_overrides_extension() {
        let compiler = Compiler::new("settings.txt", Some("yaml".into()));
        assert_eq!(compiler.chain().formats(), ["yaml"]);

        let compiler = Compiler::new("settings.yml", Some(ParserChain::default()));
        assert!(compiler.chain().is_empty());
    }

    #[test]
    fn test_compile_without_extension_returns_raw_content() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "flat-key-local", "local\n");

        assert_eq!(compile(&path, None).unwrap(), ConfigTree::from("local"));
    }

    #[test]
    fn test_compile_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.yml",
            "local:\n  value: <%= 'lo' + 'cal' %>\n",
        );

        let tree = compile(&path, None).unwrap();
        assert_eq!(
            tree.get_path(&["local", "value"]),
            Some(&ConfigTree::from("local"))
        );
    }

    #[test]
    fn test_compile_with_explicit_chain() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "settings", ":mode: fast\n");

        let tree = compile(&path, Some("yml".into())).unwrap();
        assert_eq!(tree.get("mode"), Some(&ConfigTree::from("fast")));
    }

    #[test]
    fn test_empty_content_short_circuits() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.yml", "\n");

        assert_eq!(compile(&path, None).unwrap(), ConfigTree::from(""));
    }

    #[test]
    fn test_structured_output_cannot_feed_another_parser() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yml.yml", "a: 1\n");

        let result = compile(&path, None);
        assert!(matches!(result, Err(CompileError::NotText { .. })));
    }

    #[test]
    fn test_scalar_output_feeds_next_parser() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "nested.yml.yml", "'a: <%= 1 + 1 %>'\n");

        let tree = compile(&path, None).unwrap();
        assert_eq!(tree.get("a").and_then(ConfigTree::as_i64), Some(2));
    }

    #[test]
    fn test_missing_file() {
        let result = compile("/nonexistent/path/config.yml", None);
        let err = result.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("/nonexistent/path/config.yml"));
    }

    #[test]
    fn test_unknown_parser() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", "{}");

        let result = compile(&path, None);
        assert!(matches!(result, Err(CompileError::ParserNotFound(_))));
    }

    #[test]
    fn test_missing_file_reported_before_unknown_parser() {
        let result = compile("/nonexistent/path/config.json", None);
        assert!(matches!(result, Err(CompileError::FileNotFound { .. })));
    }

    #[test]
    fn test_blank_content_skips_unknown_parser() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.json", "\n");

        assert_eq!(compile(&path, None).unwrap(), ConfigTree::from(""));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.yml", "key: [unclosed\n");

        let err = compile(&path, None).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_chain_deserializes_from_one_or_many() {
        #[derive(Deserialize)]
        struct Holder {
            chain: ParserChain,
        }

        let one: Holder = toml::from_str(r#"chain = "yml""#).unwrap();
        let many: Holder = toml::from_str(r#"chain = ["yml", "yaml"]"#).unwrap();

        assert_eq!(one.chain.formats(), ["yml"]);
        assert_eq!(many.chain.formats(), ["yml", "yaml"]);
    }
}
