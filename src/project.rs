//! Project layout and project-root resolution.
//!
//! The generator writes `baml_client/` next to `baml_src/` in the project
//! directory. Target file names are fixed; only the project directory itself
//! is resolved, in this order:
//!
//! 1. Explicit `--project` flag
//! 2. `BAML_PROJECT_DIR` environment variable
//! 3. Nearest ancestor of the current directory holding `baml_client/`
//! 4. The current directory

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Generated client package directory.
pub const CLIENT_DIR: &str = "baml_client";
/// BAML source directory the runtime must load from.
pub const SRC_DIR: &str = "baml_src";
pub const GLOBALS_FILE: &str = "globals.py";
pub const INIT_FILE: &str = "__init__.py";

/// Environment variable naming the project directory.
pub const PROJECT_ENV: &str = "BAML_PROJECT_DIR";

/// Fixed file layout under a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn client_dir(&self) -> PathBuf {
        self.root.join(CLIENT_DIR)
    }

    pub fn globals_py(&self) -> PathBuf {
        self.client_dir().join(GLOBALS_FILE)
    }

    pub fn init_py(&self) -> PathBuf {
        self.client_dir().join(INIT_FILE)
    }
}

/// Which rule picked the project directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    Flag,
    Env,
    Detected,
    CurrentDir,
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSource::Flag => write!(f, "--project"),
            RootSource::Env => write!(f, "{PROJECT_ENV}"),
            RootSource::Detected => write!(f, "auto-detected"),
            RootSource::CurrentDir => write!(f, "current directory"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("project directory does not exist: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the project directory.
///
/// `env_value` and `cwd` are passed in rather than read here so callers
/// control the process environment.
pub fn resolve_project(
    explicit: Option<PathBuf>,
    env_value: Option<String>,
    cwd: &Path,
) -> Result<(ProjectLayout, RootSource), ProjectError> {
    if let Some(path) = explicit {
        let root = path
            .canonicalize()
            .map_err(|source| ProjectError::NotFound { path, source })?;
        return Ok((ProjectLayout::new(root), RootSource::Flag));
    }

    if let Some(env_path) = env_value.filter(|v| !v.trim().is_empty()) {
        let path = PathBuf::from(&env_path);
        match path.canonicalize() {
            Ok(root) => return Ok((ProjectLayout::new(root), RootSource::Env)),
            Err(_) => tracing::warn!(
                "{PROJECT_ENV} is set but path doesn't exist: {env_path}; falling back"
            ),
        }
    }

    if let Some(root) = detect_project(cwd) {
        tracing::debug!("auto-detected project at {}", root.display());
        return Ok((ProjectLayout::new(root), RootSource::Detected));
    }

    Ok((ProjectLayout::new(cwd.to_path_buf()), RootSource::CurrentDir))
}

/// Walk up from `start` looking for a directory that holds `baml_client/`.
fn detect_project(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CLIENT_DIR).is_dir())
        .map(Path::to_path_buf)
}
