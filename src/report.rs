//! Status lines printed for each patch.
//!
//! Kept free of terminal colors so the wording can be tested; `main.rs`
//! colors lines by [`Severity`].

use crate::patch::{PatchError, PatchOutcome, TargetPatch};

pub const BANNER: &str = "🔧 Fixing BAML client paths...";
pub const DONE: &str =
    "✅ Done! Your baml_client now always uses the correct project's baml_src directory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
}

impl Severity {
    pub fn symbol(self) -> &'static str {
        match self {
            Severity::Success => "✓",
            // Two spaces: the emoji renders double-width in most terminals.
            Severity::Warning => "⚠️ ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub severity: Severity,
    pub text: String,
}

impl StatusLine {
    /// Symbol and text, uncolored.
    pub fn render(&self) -> String {
        format!("{} {}", self.severity.symbol(), self.text)
    }
}

/// Describe the result of running `patch`.
pub fn status_line(
    patch: &dyn TargetPatch,
    result: &Result<PatchOutcome, PatchError>,
) -> StatusLine {
    match result {
        Ok(PatchOutcome::Applied { .. }) => StatusLine {
            severity: Severity::Success,
            text: patch.applied_message().to_string(),
        },
        Ok(PatchOutcome::WouldApply { .. }) => StatusLine {
            severity: Severity::Success,
            text: format!("Would apply: {}", patch.applied_message()),
        },
        Ok(PatchOutcome::AlreadyApplied { .. }) => StatusLine {
            severity: Severity::Success,
            text: patch.already_message().to_string(),
        },
        Err(err) => StatusLine {
            severity: Severity::Warning,
            text: err.to_string(),
        },
    }
}
