//! `__init__.py`: inject code that re-applies the globals fix on import.

use crate::edit::Edit;
use crate::patch::snippet::{init_snippet, INIT_MARKER};
use crate::patch::{PatchError, TargetPatch};
use crate::project::{ProjectLayout, INIT_FILE};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VERSION_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^__version__[ \t]*=").expect("anchor regex is valid"));

pub struct InitPatch;

impl TargetPatch for InitPatch {
    fn label(&self) -> &'static str {
        INIT_FILE
    }

    fn target(&self, layout: &ProjectLayout) -> PathBuf {
        layout.init_py()
    }

    fn is_patched(&self, content: &str) -> bool {
        content.contains(INIT_MARKER)
    }

    fn plan(&self, file: &Path, content: &str) -> Result<Vec<Edit>, PatchError> {
        let anchor = VERSION_ANCHOR
            .find(content)
            .ok_or_else(|| PatchError::AnchorNotFound {
                file: file.to_path_buf(),
                label: self.label(),
                anchor: "__version__",
            })?;

        Ok(vec![Edit::insert(
            file,
            anchor.start(),
            format!("{}\n\n", init_snippet()),
        )])
    }

    fn applied_message(&self) -> &'static str {
        "Added auto-fix to __init__.py"
    }

    fn already_message(&self) -> &'static str {
        "__init__.py already has auto-fix code"
    }
}
