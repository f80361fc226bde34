//! Error types for the backlink engine.
//!
//! Library code returns [`BacklinkError`]; the CLI wraps it with `anyhow` context.

use std::path::PathBuf;
use thiserror::Error;

/// Error types for corpus scanning, extraction, and graph rendering.
#[derive(Error, Debug)]
pub enum BacklinkError {
    /// Corpus root directory does not exist (scans treat this as an empty corpus).
    #[error("corpus root not found: {}", .0.display())]
    CorpusRootMissing(PathBuf),

    /// One document could not be read or parsed; it contributes zero links.
    #[error("failed to parse document '{}': {reason}", path.display())]
    DocumentParseFailure {
        /// Document path.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// Graph renderer or viewer executable could not be resolved.
    #[error("external tool not found: {0}")]
    MissingExternalTool(String),

    /// External tool ran but exited unsuccessfully.
    #[error("external tool '{tool}' failed ({status}): {stderr}")]
    ExternalToolFailed {
        /// Executable name.
        tool: String,
        /// Exit status description.
        status: String,
        /// Captured stderr (clipped).
        stderr: String,
    },

    /// Referenced document does not exist yet.
    #[error("document not found: {}", .0.display())]
    TargetFileAbsent(PathBuf),

    /// Path resolves outside the corpus root or has the wrong extension.
    #[error("path is not a corpus document: {}", .0.display())]
    OutsideCorpus(PathBuf),

    /// Invalid configuration input.
    #[error("invalid backlinks config: {0}")]
    Config(String),

    /// Background rebuild worker did not complete (panic or runtime shutdown).
    #[error("rebuild aborted: {0}")]
    RebuildAborted(String),

    /// Low-level I/O error from std::io.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for backlink operations.
pub type Result<T> = std::result::Result<T, BacklinkError>;
