//! Error types for docsync.
//!
//! Library crates use [`DocSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Line/column position inside a document (both 1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Top-level error type for all docsync operations.
#[derive(Debug, thiserror::Error)]
pub enum DocSyncError {
    /// A code snapshot points at a file or locator that does not exist.
    #[error("snapshot source not found in {document:?}: {reference} ({reason})")]
    SourceNotFound {
        document: PathBuf,
        reference: String,
        reason: String,
    },

    /// An image reference does not resolve to a file on disk.
    #[error("image asset not found in {document:?}: {reference} (looked for {resolved:?})")]
    AssetNotFound {
        document: PathBuf,
        reference: String,
        resolved: PathBuf,
    },

    /// An image asset exists but its dimensions could not be read.
    #[error("invalid image asset in {document:?}: {reference} ({message})")]
    InvalidAsset {
        document: PathBuf,
        reference: String,
        message: String,
    },

    /// The document is not valid markup (or its frontmatter is not valid YAML).
    #[error("parse error in {path:?}{}: {message}", .location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default())]
    Parse {
        path: PathBuf,
        location: Option<SourceLocation>,
        message: String,
    },

    /// The rewritten document could not be written back.
    #[error("write error at {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Filesystem I/O error while reading.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Document enumeration failed (bad pattern, unreadable directory).
    #[error("discovery error: {message}")]
    Discovery { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocSyncError>;

impl DocSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a discovery error from any displayable message.
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery {
            message: msg.into(),
        }
    }

    /// Create a parse error for a document.
    pub fn parse(
        path: impl Into<PathBuf>,
        location: Option<SourceLocation>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            location,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failed write-back.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Short name of the stage that produced this error, for reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "code-snapshots",
            Self::AssetNotFound { .. } | Self::InvalidAsset { .. } => "image-references",
            Self::Parse { .. } => "parse",
            Self::Write { .. } => "write",
            Self::Io { .. } => "read",
            Self::Config { .. } => "config",
            Self::Discovery { .. } => "discovery",
        }
    }
}
