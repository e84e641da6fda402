//! `globals.py`: replace the relative `"baml_src"` runtime initialization.

use crate::edit::Edit;
use crate::patch::snippet::{replacement_block, GLOBALS_SENTINEL, PATH_IMPORT};
use crate::patch::{PatchError, TargetPatch};
use crate::project::{ProjectLayout, GLOBALS_FILE};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `[target =] BamlRuntime.from_files(<ws>"baml_src",` at the start of a line.
static RUNTIME_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^(?P<indent>[ \t]*)(?P<target>[A-Za-z_][A-Za-z0-9_]*[ \t]*=[ \t]*)?BamlRuntime\.from_files\((?P<ws>\s*)"baml_src","#,
    )
    .expect("runtime call regex is valid")
});

static IMPORT_OS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^import os\b[^\n]*\n?").expect("import regex is valid"));

pub struct GlobalsPatch;

impl TargetPatch for GlobalsPatch {
    fn label(&self) -> &'static str {
        GLOBALS_FILE
    }

    fn target(&self, layout: &ProjectLayout) -> PathBuf {
        layout.globals_py()
    }

    fn is_patched(&self, content: &str) -> bool {
        content.contains(GLOBALS_SENTINEL)
    }

    fn plan(&self, file: &Path, content: &str) -> Result<Vec<Edit>, PatchError> {
        let mut calls = RUNTIME_CALL.captures_iter(content);
        let Some(caps) = calls.next() else {
            return Err(PatchError::PatternNotFound {
                file: file.to_path_buf(),
                label: self.label(),
            });
        };
        let extra = calls.count();
        if extra > 0 {
            return Err(PatchError::AmbiguousPattern {
                file: file.to_path_buf(),
                count: extra + 1,
            });
        }

        let whole = caps.get(0).expect("group 0 always participates");
        let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        let mut edits = vec![Edit::new(
            file,
            whole.start(),
            whole.end(),
            replacement_block(group("indent"), group("target"), group("ws")),
            whole.as_str(),
        )];

        if !content.contains(PATH_IMPORT) {
            edits.push(path_import_edit(file, content));
        }

        Ok(edits)
    }

    fn applied_message(&self) -> &'static str {
        "Fixed globals.py to use absolute paths"
    }

    fn already_message(&self) -> &'static str {
        "globals.py already uses absolute paths"
    }
}

/// Insert `from pathlib import Path` after the first `import os` line.
///
/// Without an `import os` line the import goes after the leading comment
/// header and any `from __future__` imports.
fn path_import_edit(file: &Path, content: &str) -> Edit {
    if let Some(m) = IMPORT_OS.find(content) {
        let text = if m.as_str().ends_with('\n') {
            format!("{PATH_IMPORT}\n")
        } else {
            format!("\n{PATH_IMPORT}\n")
        };
        return Edit::insert(file, m.end(), text);
    }

    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("from __future__")
        {
            offset += line.len();
        } else {
            break;
        }
    }

    let text = if offset > 0 && !content[..offset].ends_with('\n') {
        format!("\n{PATH_IMPORT}\n")
    } else {
        format!("{PATH_IMPORT}\n")
    };
    Edit::insert(file, offset, text)
}
