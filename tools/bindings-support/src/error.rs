//! Error types for the bindings maintenance tooling
//!
//! Every failure here is meant to stop the operator: there are no retries,
//! and no library is silently skipped.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

/// Result type for bindings tooling operations
pub type BindingsResult<T> = Result<T, BindingsError>;

/// Errors that can occur while maintaining external libraries
#[derive(Error, Debug)]
pub enum BindingsError {
    /// The bundle layout or a library's bindings folder is misconfigured
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// A git operation was requested against a library that forbids it
    #[error("Cannot {operation} for {library}: {reason}")]
    Precondition {
        library: String,
        operation: String,
        reason: String,
    },

    /// A shell command exited with a non-zero status
    #[error("Command failed ({}): {}", display_code(.code), .command)]
    Process { command: String, code: Option<i32> },

    /// A program could not be started at all
    #[error("Failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation, listing or file write failure
    #[error("Filesystem operation failed on {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required external program could not be located
    #[error("Could not find `{tool}` in PATH")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    /// xshell could not spawn or configure a command
    #[error("Shell error")]
    Shell(#[from] xshell::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

impl BindingsError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!("Configuration error: {}", reason);
        Self::Configuration { reason }
    }

    /// Create a precondition error
    pub fn precondition(
        library: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let library = library.into();
        let operation = operation.into();
        let reason = reason.into();
        warn!("Refusing to {} for {}: {}", operation, library, reason);
        Self::Precondition {
            library,
            operation,
            reason,
        }
    }

    /// Create a process error
    pub fn process(command: impl Into<String>, code: Option<i32>) -> Self {
        let command = command.into();
        error!("Command failed: {} ({})", command, display_code(&code));
        Self::Process { command, code }
    }

    /// Wrap an io error with the path it happened on
    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        error!("Filesystem error on {}: {}", path.display(), source);
        Self::Filesystem { path, source }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    pub fn is_process(&self) -> bool {
        matches!(self, Self::Process { .. } | Self::Spawn { .. })
    }
}

/// Attach a path to io results, the way `with_context` does for anyhow
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: impl AsRef<Path>) -> BindingsResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> BindingsResult<T> {
        self.map_err(|e| BindingsError::filesystem(path, e))
    }
}
