//! Parse validation for edited Python sources.
//!
//! # Hard Rule
//!
//! After computing an edit, re-parse the result with tree-sitter. If the
//! original parsed cleanly and the edited file does not, the edit is refused
//! and nothing is written.
//!
//! A file that already fails to parse is not judged: tree-sitter's error
//! recovery gives no stable way to tell old errors from new ones.

use crate::ts::{ParsedSource, PythonParser, TreeSitterError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Parse error introduced: found {count} ERROR nodes")]
    ParseErrorIntroduced {
        count: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("Tree-sitter error: {0}")]
    TreeSitter(#[from] TreeSitterError),
}

/// Location of an error node in the source.
#[derive(Debug, Clone)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Parse validator using the tree-sitter Python grammar.
pub struct ParseValidator {
    parser: PythonParser,
}

impl ParseValidator {
    pub fn new() -> Result<Self, TreeSitterError> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Validate that source has no parse errors.
    pub fn validate(&mut self, source: &str) -> Result<(), ValidationError> {
        let parsed = self.parser.parse_with_source(source)?;
        let errors = collect_errors(&parsed);

        if !errors.is_empty() {
            return Err(ValidationError::ParseErrorIntroduced {
                count: errors.len(),
                errors,
            });
        }

        Ok(())
    }

    /// Check that `edited` still parses if `original` did.
    pub fn validate_edit(&mut self, original: &str, edited: &str) -> Result<(), ValidationError> {
        if self.parser.parse_with_source(original)?.has_errors() {
            tracing::debug!("original source has parse errors; skipping edit validation");
            return Ok(());
        }

        self.validate(edited)
    }
}

fn collect_errors(parsed: &ParsedSource<'_>) -> Vec<ErrorLocation> {
    let source = parsed.source;
    parsed
        .error_nodes()
        .into_iter()
        .map(|node| {
            // Up to 20 bytes of context on either side, clamped to char boundaries.
            let mut context_start = node.byte_start.saturating_sub(20);
            while !source.is_char_boundary(context_start) {
                context_start -= 1;
            }
            let mut context_end = (node.byte_end + 20).min(source.len());
            while !source.is_char_boundary(context_end) {
                context_end += 1;
            }

            ErrorLocation {
                byte_start: node.byte_start,
                byte_end: node.byte_end,
                line: node.start_point.row + 1,
                column: node.start_point.column + 1,
                context: source[context_start..context_end].replace('\n', "\\n"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_python_passes() {
        let mut validator = ParseValidator::new().unwrap();
        assert!(validator
            .validate("from pathlib import Path\n\nx = Path(__file__).parent\n")
            .is_ok());
    }

    #[test]
    fn invalid_python_reports_location() {
        let mut validator = ParseValidator::new().unwrap();
        let err = validator.validate("x = (1,\n").unwrap_err();

        match err {
            ValidationError::ParseErrorIntroduced { count, errors } => {
                assert!(count >= 1);
                assert!(errors.iter().all(|e| e.line >= 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn edit_that_keeps_syntax_is_accepted() {
        let mut validator = ParseValidator::new().unwrap();
        let original = "import os\n";
        let edited = "import os\nfrom pathlib import Path\n";
        assert!(validator.validate_edit(original, edited).is_ok());
    }

    #[test]
    fn edit_that_breaks_syntax_is_rejected() {
        let mut validator = ParseValidator::new().unwrap();
        let original = "import os\n";
        let edited = "import os\nfrom pathlib import\n";
        assert!(matches!(
            validator.validate_edit(original, edited),
            Err(ValidationError::ParseErrorIntroduced { .. })
        ));
    }

    #[test]
    fn already_broken_source_is_not_judged() {
        let mut validator = ParseValidator::new().unwrap();
        let original = "def broken(:\n    pass\n";
        let edited = "x = (\ndef broken(:\n    pass\n";
        assert!(validator.validate_edit(original, edited).is_ok());
    }
}
