//! Error kinds for the build core.
//!
//! Leaf error types use `thiserror`; orchestration code collects these into
//! `anyhow::Result` at phase boundaries so propagation policy (fatal vs.
//! collected-and-continue vs. silently dropped) is decided by the caller,
//! not baked into the type.

use crate::primitives::SourcePath;
use std::path::PathBuf;

/// A known substring emitted by interpreter/runtime shutdown paths.
/// Errors whose message contains this marker are swallowed silently.
pub const SHUTDOWN_MARKER: &str = "during shutdown";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("discovery error at {path}: {message}")]
    Discovery { path: SourcePath, message: String },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("parse error in {path}: {message}")]
    Parse { path: SourcePath, message: String },

    #[error("render error in {path}: {message}")]
    Render { path: SourcePath, message: String },

    #[error("section validation error at {path:?}: {message}")]
    SectionValidation {
        path: Option<SourcePath>,
        message: String,
    },

    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shutdown: {0}")]
    Shutdown(String),
}

impl BuildError {
    /// `true` if this error originates from interpreter/process shutdown
    /// and must be dropped silently rather than reported.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, BuildError::Shutdown(_))
            || self.to_string().contains(SHUTDOWN_MARKER)
    }
}

/// Classify a raw error message as shutdown-origin using the marker
/// substring convention (for errors surfaced from opaque collaborators).
pub fn is_shutdown_message(message: &str) -> bool {
    message.contains(SHUTDOWN_MARKER)
}
