//! BAML Path Fixer: post-generation patches for `baml_client`
//!
//! `baml-cli generate` emits a Python client whose runtime loads
//! `"baml_src"` relative to the process's working directory. This crate
//! rewrites the generated client so the path is resolved from the client's
//! own location instead.
//!
//! # Architecture
//!
//! Every change compiles down to [`Edit`], a verified byte-span replacement.
//! The two targets ([`GlobalsPatch`], [`InitPatch`]) only decide *where*
//! edits go; [`patch::run`] handles reading, idempotency, validation and the
//! atomic write.
//!
//! # Safety
//!
//! - Edits verify expected before-text before applying
//! - Atomic file writes (tempfile + fsync + rename)
//! - Project boundary enforcement (no patching through symlinks)
//! - Python parse validation of the edited file
//! - Idempotent: sentinel checks make re-runs no-ops
//!
//! # Example
//!
//! ```no_run
//! use baml_path_fixer::{run_all, Mode, ProjectLayout};
//!
//! let layout = ProjectLayout::new("/path/to/project");
//! for (patch, result) in run_all(&layout, Mode::Write) {
//!     println!("{}: {:?}", patch.label(), result.is_ok());
//! }
//! ```

pub mod edit;
pub mod patch;
pub mod project;
pub mod report;
pub mod safety;
pub mod ts;
pub mod validate;

// Re-exports
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use patch::{
    run, run_all, GlobalsPatch, InitPatch, Mode, PatchError, PatchOutcome, TargetPatch,
    ALL_PATCHES,
};
pub use project::{resolve_project, ProjectError, ProjectLayout, RootSource};
pub use report::{status_line, Severity, StatusLine};
pub use safety::{ProjectGuard, SafetyError};
pub use ts::{PythonParser, TreeSitterError};
pub use validate::{ParseValidator, ValidationError};
