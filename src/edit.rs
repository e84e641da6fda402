use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Every patch compiles down to a list of these. Planning happens against the
/// text that was read; applying re-reads the file and re-checks each span, so
/// a file that changed in between is never half-patched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Path to the file to edit
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to put at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find at the span before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at {file}:{byte_start}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("Overlapping edits at bytes {first_end} and {second_start}")]
    Overlapping {
        first_end: usize,
        second_start: usize,
    },

    #[error("Batch mixes files: {0} and {1}")]
    MixedFiles(PathBuf, PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid edit would create malformed UTF-8")]
    InvalidUtf8Edit,
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    Applied { file: PathBuf, bytes_changed: usize },
    /// Current text at the span already equals new_text
    AlreadyApplied { file: PathBuf },
}

impl Edit {
    /// Replace `[byte_start, byte_end)`, expecting `expected_before` to be there now.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        let expected = expected_before.into();
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(&expected),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(file: impl Into<PathBuf>, offset: usize, text: impl Into<String>) -> Self {
        Self::new(file, offset, offset, text, "")
    }

    /// Validate the edit against the given contents.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, content: &'a [u8]) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        let current_text = std::str::from_utf8(&content[self.byte_start..self.byte_end])?;

        if current_text == self.new_text {
            return Ok(current_text);
        }

        if !self.expected_before.matches(current_text) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current_text.to_string(),
            });
        }

        Ok(current_text)
    }

    /// Compute the text that applying `edits` to `content` would produce.
    ///
    /// Nothing touches the file system.
    pub fn preview(content: &str, edits: &[Edit]) -> Result<String, EditError> {
        let (bytes, _) = splice(content.as_bytes(), edits)?;
        String::from_utf8(bytes).map_err(|_| EditError::InvalidUtf8Edit)
    }

    /// Apply this edit to the file system atomically.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        let mut results = Edit::apply_batch(std::slice::from_ref(self))?;
        Ok(results.remove(0))
    }

    /// Apply several edits to one file in a single atomic write.
    ///
    /// The file is re-read and every span re-verified first. Results come back
    /// in the same order as `edits`.
    pub fn apply_batch(edits: &[Edit]) -> Result<Vec<EditResult>, EditError> {
        let Some(first) = edits.first() else {
            return Ok(Vec::new());
        };
        if let Some(other) = edits.iter().find(|e| e.file != first.file) {
            return Err(EditError::MixedFiles(first.file.clone(), other.file.clone()));
        }

        let original = fs::read(&first.file)?;
        let (new_content, results) = splice(&original, edits)?;

        if results
            .iter()
            .any(|r| matches!(r, EditResult::Applied { .. }))
        {
            atomic_write(&first.file, &new_content)?;

            // Fresh mtime so stale __pycache__ bytecode is not reused.
            let now = filetime::FileTime::now();
            filetime::set_file_mtime(&first.file, now)?;
        }

        Ok(results)
    }
}

/// Splice edits into `content`, validating every span against the original.
fn splice(content: &[u8], edits: &[Edit]) -> Result<(Vec<u8>, Vec<EditResult>), EditError> {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by_key(|&i| (edits[i].byte_start, edits[i].byte_end));

    for pair in order.windows(2) {
        let (earlier, later) = (&edits[pair[0]], &edits[pair[1]]);
        if earlier.byte_end > later.byte_start {
            return Err(EditError::Overlapping {
                first_end: earlier.byte_end,
                second_start: later.byte_start,
            });
        }
    }

    let mut results: Vec<Option<EditResult>> = vec![None; edits.len()];
    let mut out = Vec::with_capacity(
        content.len() + edits.iter().map(|e| e.new_text.len()).sum::<usize>(),
    );
    let mut cursor = 0;

    for &idx in &order {
        let edit = &edits[idx];
        let current = edit.validate(content)?;

        out.extend_from_slice(&content[cursor..edit.byte_start]);
        out.extend_from_slice(edit.new_text.as_bytes());
        cursor = edit.byte_end;

        results[idx] = Some(if current == edit.new_text {
            EditResult::AlreadyApplied {
                file: edit.file.clone(),
            }
        } else {
            EditResult::Applied {
                file: edit.file.clone(),
                bytes_changed: edit.new_text.len(),
            }
        });
    }
    out.extend_from_slice(&content[cursor..]);

    std::str::from_utf8(&out).map_err(|_| EditError::InvalidUtf8Edit)?;

    Ok((out, results.into_iter().flatten().collect()))
}

/// Atomic file write: tempfile + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Same directory keeps the rename on one filesystem.
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the permissions of the file being replaced.
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_verification_exact_match() {
        let verify = EditVerification::ExactMatch("import os".to_string());
        assert!(verify.matches("import os"));
        assert!(!verify.matches("import sys"));
    }

    #[test]
    fn test_edit_verification_hash() {
        let text = "\"baml_src\",";
        let verify = EditVerification::Hash(xxh3_64(text.as_bytes()));
        assert!(verify.matches(text));
        assert!(!verify.matches("str(_baml_src_dir),"));
    }

    #[test]
    fn test_edit_verification_from_text_large() {
        let text = "x".repeat(2000);
        assert!(matches!(
            EditVerification::from_text(&text),
            EditVerification::Hash(_)
        ));
        assert!(matches!(
            EditVerification::from_text("small"),
            EditVerification::ExactMatch(_)
        ));
    }

    #[test]
    fn test_edit_validation_invalid_range() {
        let edit = Edit::new("globals.py", 5, 20, "replacement", "");
        let result = edit.validate(b"hello world");
        assert!(matches!(result, Err(EditError::InvalidByteRange { .. })));
    }

    #[test]
    fn test_edit_validation_inverted_range() {
        let edit = Edit::new("globals.py", 10, 5, "replacement", "");
        let result = edit.validate(b"hello world");
        assert!(matches!(result, Err(EditError::InvalidByteRange { .. })));
    }

    #[test]
    fn test_preview_applies_in_offset_order() {
        let content = "import os\nx = \"baml_src\"\n";
        let edits = vec![
            Edit::new("globals.py", 14, 24, "str(root)", "\"baml_src\""),
            Edit::insert("globals.py", 10, "from pathlib import Path\n"),
        ];

        let out = Edit::preview(content, &edits).unwrap();
        assert_eq!(out, "import os\nfrom pathlib import Path\nx = str(root)\n");
    }

    #[test]
    fn test_preview_rejects_overlap() {
        let edits = vec![
            Edit::new("a.py", 0, 5, "AAAAA", "hello"),
            Edit::new("a.py", 3, 8, "BBBBB", "lo wo"),
        ];
        assert!(matches!(
            Edit::preview("hello world", &edits),
            Err(EditError::Overlapping { .. })
        ));
    }

    #[test]
    fn test_preview_rejects_stale_before_text() {
        let edits = vec![Edit::new("a.py", 0, 5, "HELLO", "howdy")];
        assert!(matches!(
            Edit::preview("hello world", &edits),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn test_atomic_write_integration() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("globals.py");
        fs::write(&file_path, b"original content").unwrap();

        let result = Edit::new(&file_path, 0, 8, "modified", "original")
            .apply()
            .unwrap();

        assert!(matches!(result, EditResult::Applied { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "modified content");
    }

    #[test]
    fn test_edit_idempotency_application() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("globals.py");
        fs::write(&file_path, b"hello world").unwrap();

        let result = Edit::new(&file_path, 0, 5, "hello", "hello").apply().unwrap();

        assert!(matches!(result, EditResult::AlreadyApplied { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "hello world");
    }

    #[test]
    fn test_batch_results_keep_input_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("__init__.py");
        fs::write(&file_path, b"line1\nline2\nline3\n").unwrap();

        let edits = vec![
            Edit::new(&file_path, 12, 17, "LINE3", "line3"),
            Edit::new(&file_path, 0, 5, "line1", "line1"),
            Edit::new(&file_path, 6, 11, "LINE2", "line2"),
        ];

        let results = Edit::apply_batch(&edits).unwrap();
        assert!(matches!(results[0], EditResult::Applied { .. }));
        assert!(matches!(results[1], EditResult::AlreadyApplied { .. }));
        assert!(matches!(results[2], EditResult::Applied { .. }));
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "line1\nLINE2\nLINE3\n"
        );
    }

    #[test]
    fn test_batch_rejects_mixed_files() {
        let edits = vec![
            Edit::insert("a.py", 0, "x"),
            Edit::insert("b.py", 0, "y"),
        ];
        assert!(matches!(
            Edit::apply_batch(&edits),
            Err(EditError::MixedFiles(..))
        ));
    }
}
