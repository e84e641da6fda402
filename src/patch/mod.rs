//! Patch driver for the generated `baml_client` package.
//!
//! Each target file is described by a [`TargetPatch`]. [`run`] takes it
//! through the same steps every time:
//!
//! - existence and project-boundary checks
//! - sentinel check (already patched is success, not an error)
//! - edit planning against the current text
//! - Python parse validation of the would-be result
//! - one atomic write, or none at all

pub mod globals;
pub mod init;
pub mod snippet;

pub use globals::GlobalsPatch;
pub use init::InitPatch;

use crate::edit::{Edit, EditError};
use crate::project::ProjectLayout;
use crate::safety::{ProjectGuard, SafetyError};
use crate::validate::{ParseValidator, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One generated file and how to patch it.
pub trait TargetPatch {
    /// File name used in status lines.
    fn label(&self) -> &'static str;

    fn target(&self, layout: &ProjectLayout) -> PathBuf;

    /// Sentinel check; true means the file needs nothing.
    fn is_patched(&self, content: &str) -> bool;

    /// Edits that patch `content`. Called only when `is_patched` is false.
    fn plan(&self, file: &Path, content: &str) -> Result<Vec<Edit>, PatchError>;

    fn applied_message(&self) -> &'static str;

    fn already_message(&self) -> &'static str;
}

/// Both targets, in the order they are applied.
pub const ALL_PATCHES: [&dyn TargetPatch; 2] = [&GlobalsPatch, &InitPatch];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Write,
    /// Plan and validate, but never write.
    DryRun,
}

/// Successful result of running one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome should be reported"]
pub enum PatchOutcome {
    Applied {
        file: PathBuf,
        before: String,
        after: String,
    },
    /// Dry run: the patch applies cleanly but nothing was written.
    WouldApply {
        file: PathBuf,
        before: String,
        after: String,
    },
    AlreadyApplied { file: PathBuf },
}

impl PatchOutcome {
    /// Before/after text when the outcome carries a change.
    pub fn change(&self) -> Option<(&Path, &str, &str)> {
        match self {
            PatchOutcome::Applied { file, before, after }
            | PatchOutcome::WouldApply { file, before, after } => {
                Some((file.as_path(), before.as_str(), after.as_str()))
            }
            PatchOutcome::AlreadyApplied { .. } => None,
        }
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied { file, .. } => write!(f, "Applied patch to {}", file.display()),
            PatchOutcome::WouldApply { file, .. } => {
                write!(f, "Would apply patch to {}", file.display())
            }
            PatchOutcome::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{} not found", file.display())]
    MissingFile { file: PathBuf },

    #[error("Could not find pattern to replace in {label}")]
    PatternNotFound { file: PathBuf, label: &'static str },

    #[error("Pattern matched {count} locations in {} (expected 1)", file.display())]
    AmbiguousPattern { file: PathBuf, count: usize },

    #[error("Could not find {anchor} in {label}")]
    AnchorNotFound {
        file: PathBuf,
        label: &'static str,
        anchor: &'static str,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edit error: {0}")]
    Edit(#[from] EditError),

    #[error("refusing to edit: {0}")]
    Safety(#[from] SafetyError),

    #[error("patched file would not parse: {0}")]
    Validation(#[from] ValidationError),
}

impl PatchError {
    /// True when the file was simply not in the expected shape.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(
            self,
            PatchError::PatternNotFound { .. }
                | PatchError::AmbiguousPattern { .. }
                | PatchError::AnchorNotFound { .. }
        )
    }
}

/// Run one patch against the project.
pub fn run(
    patch: &dyn TargetPatch,
    layout: &ProjectLayout,
    mode: Mode,
) -> Result<PatchOutcome, PatchError> {
    let target = patch.target(layout);
    if !target.is_file() {
        return Err(PatchError::MissingFile { file: target });
    }

    let guard = ProjectGuard::new(layout.root())?;
    let file = guard.validate_path(&target)?;

    let before = fs::read_to_string(&file).map_err(|source| PatchError::Io {
        path: file.clone(),
        source,
    })?;

    if patch.is_patched(&before) {
        tracing::debug!("{} already patched", file.display());
        return Ok(PatchOutcome::AlreadyApplied { file });
    }

    let edits = patch.plan(&file, &before)?;
    let after = Edit::preview(&before, &edits)?;

    ParseValidator::new()
        .map_err(ValidationError::from)?
        .validate_edit(&before, &after)?;

    tracing::debug!(
        "{} edit(s) planned for {} ({:?})",
        edits.len(),
        file.display(),
        mode
    );

    match mode {
        Mode::DryRun => Ok(PatchOutcome::WouldApply {
            file,
            before,
            after,
        }),
        Mode::Write => {
            let _ = Edit::apply_batch(&edits)?;
            Ok(PatchOutcome::Applied {
                file,
                before,
                after,
            })
        }
    }
}

/// Run every patch in order. A failure in one never stops the next.
pub fn run_all(
    layout: &ProjectLayout,
    mode: Mode,
) -> Vec<(&'static dyn TargetPatch, Result<PatchOutcome, PatchError>)> {
    ALL_PATCHES
        .iter()
        .map(|patch| (*patch, run(*patch, layout, mode)))
        .collect()
}
