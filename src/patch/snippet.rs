//! Python text emitted into the generated client.
//!
//! The replacement block is defined once here. The self-healing code injected
//! into `__init__.py` embeds the same block, so both paths write identical
//! text into `globals.py`.

use crate::project::{GLOBALS_FILE, SRC_DIR};

/// Present in `globals.py` once it resolves `baml_src` absolutely.
pub const GLOBALS_SENTINEL: &str = "_baml_src_dir";

/// Present in `__init__.py` once the self-healing code is injected.
pub const INIT_MARKER: &str = "# Auto-fix: Ensure baml_src path";

pub const PATH_IMPORT: &str = "from pathlib import Path";

/// Assignment target the generator uses for the runtime.
pub const RUNTIME_TARGET: &str = "DO_NOT_USE_DIRECTLY_UNLESS_YOU_KNOW_WHAT_YOURE_DOING_RUNTIME";

/// Whitespace the generator puts between `from_files(` and its first argument.
pub const CANONICAL_ARG_WS: &str = "\n  ";

/// The runtime initialization exactly as the generator emits it.
pub fn canonical_call() -> String {
    format!("{RUNTIME_TARGET} = BamlRuntime.from_files({CANONICAL_ARG_WS}\"{SRC_DIR}\",")
}

/// Block that replaces a relative `from_files("baml_src",` call.
///
/// `indent` prefixes every line, `target` is the assignment target text
/// (possibly empty) and `arg_ws` is the whitespace that preceded the first
/// argument.
pub fn replacement_block(indent: &str, target: &str, arg_ws: &str) -> String {
    format!(
        "{indent}# Resolve {SRC_DIR} relative to this file so the runtime never depends on the working directory\n\
         {indent}_baml_client_dir = Path(__file__).parent.absolute()\n\
         {indent}{GLOBALS_SENTINEL} = _baml_client_dir.parent / \"{SRC_DIR}\"\n\
         \n\
         {indent}{target}BamlRuntime.from_files({arg_ws}str({GLOBALS_SENTINEL}),"
    )
}

/// The block as it appears for the canonical generator output.
pub fn canonical_replacement() -> String {
    replacement_block("", &format!("{RUNTIME_TARGET} = "), CANONICAL_ARG_WS)
}

/// Self-healing code inserted before `__version__` in `__init__.py`.
///
/// At import time it rewrites `globals.py` with the canonical replacement if
/// regeneration put the relative path back.
pub fn init_snippet() -> String {
    format!(
        r##"{INIT_MARKER} is always resolved relative to this project
import os
from pathlib import Path

# Rewrite {GLOBALS_FILE} before it is imported so the runtime loads this project's {SRC_DIR}
_this_file = Path(__file__).absolute()
_baml_client_dir = _this_file.parent
_globals_py = _baml_client_dir / "{GLOBALS_FILE}"

if _globals_py.exists():
    _globals_content = _globals_py.read_text()
    if '"{SRC_DIR}"' in _globals_content and "{GLOBALS_SENTINEL}" not in _globals_content:
        if "{PATH_IMPORT}" not in _globals_content:
            _globals_content = _globals_content.replace(
                "import os",
                "import os\n{PATH_IMPORT}"
            )
        _replacement = '''{replacement}'''
        _globals_content = _globals_content.replace(
            {canonical},
            _replacement
        )
        _globals_py.write_text(_globals_content)
"##,
        replacement = canonical_replacement(),
        canonical = python_single_quoted(&canonical_call()),
    )
}

/// Render `text` as a single-quoted Python string literal.
fn python_single_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
