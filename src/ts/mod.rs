//! Tree-sitter integration for the generated Python sources.
//!
//! The generated `baml_client` package is Python, so parsing goes through the
//! Python grammar bundled with ast-grep-language. Parsing is only used to
//! check that an edit does not break the file's syntax.

pub mod errors;
pub mod parser;

pub use errors::TreeSitterError;
pub use parser::{ErrorNode, ParsedSource, PythonParser};
