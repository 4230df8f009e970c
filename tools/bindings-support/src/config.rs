use std::env;
use std::path::{Path, PathBuf};

use crate::error::{BindingsError, BindingsResult};

/// Overrides the bundle repository root.
pub const ROOT_ENV: &str = "IMGUI_BUNDLE_ROOT";
/// Overrides the folder holding the vendored libraries.
pub const EXTERNAL_DIR_ENV: &str = "IMGUI_BUNDLE_EXTERNAL_DIR";
/// Interpreter used to run `generate_*.py` scripts.
pub const PYTHON_ENV: &str = "IMGUI_BUNDLE_PYTHON";

/// Where the bundle lives on disk.
///
/// Every path an [`ExternalLibrary`](crate::ExternalLibrary) derives is
/// relative to `external_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    repo_root: PathBuf,
    external_dir: PathBuf,
}

impl BundleLayout {
    /// Standard layout: vendored libraries under `<repo_root>/external`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let external_dir = repo_root.join("external");
        Self {
            repo_root,
            external_dir,
        }
    }

    pub fn with_external_dir(mut self, external_dir: impl Into<PathBuf>) -> Self {
        self.external_dir = external_dir.into();
        self
    }

    /// Resolve the layout from `IMGUI_BUNDLE_ROOT` / `IMGUI_BUNDLE_EXTERNAL_DIR`,
    /// falling back to `default_root`.
    pub fn from_env_or(default_root: &Path) -> Self {
        let root = env_path(ROOT_ENV).unwrap_or_else(|| default_root.to_path_buf());
        let layout = Self::new(root);
        match env_path(EXTERNAL_DIR_ENV) {
            Some(dir) => layout.with_external_dir(dir),
            None => layout,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn external_dir(&self) -> &Path {
        &self.external_dir
    }

    /// Folder of the bindings generation tooling itself.
    pub fn bindings_generation_dir(&self) -> PathBuf {
        self.external_dir.join("bindings_generation")
    }

    /// The CMake fragment listing every pybind source file.
    pub fn cmake_fragment_path(&self) -> PathBuf {
        self.bindings_generation_dir()
            .join("cpp")
            .join("all_pybind_files.cmake")
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    match env::var_os(key) {
        Some(v) if !v.is_empty() => Some(PathBuf::from(v)),
        _ => None,
    }
}

/// Locate the Python interpreter for script generators.
///
/// `IMGUI_BUNDLE_PYTHON` wins; otherwise `python3` then `python` are looked up in `PATH`.
pub fn python_interpreter() -> BindingsResult<PathBuf> {
    if let Some(p) = env_path(PYTHON_ENV) {
        return Ok(p);
    }
    match which::which("python3") {
        Ok(p) => Ok(p),
        Err(_) => which::which("python").map_err(|source| BindingsError::ToolNotFound {
            tool: "python3".to_string(),
            source,
        }),
    }
}
