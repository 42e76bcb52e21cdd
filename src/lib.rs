//! Environment-keyed configuration loaded from templated YAML files.
//!
//! A [`Toggle`] pairs a config file holding one block per environment with a
//! key naming the active block, and looks attributes up in that block.

pub mod compiler;
mod error;
pub mod parser;
mod resolver;
pub mod template;
pub mod tree;

pub use compiler::{CompileError, Compiler, ParserChain};
pub use error::Error;
pub use parser::{Format, ParseError, Parser, ParserNotFound};
pub use resolver::{OptionsError, Toggle, ToggleOptions, Using};
pub use template::TemplateError;
pub use tree::{ConfigTree, IndifferentMap};
