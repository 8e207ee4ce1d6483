//! Error types for Tidepool
//!
//! Fatal conditions (bad server configuration, unusable disk layout)
//! are reported through `StoreError`. Per-file I/O and parse problems
//! inside the stores are *not* errors at this level: they are logged,
//! the file is skipped, and the operation reports an HTTP-style status
//! code to the HTTP-handling collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence-layer error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// `server.json` does not exist
    #[error("error opening '{}'", .0.display())]
    ConfigMissing(PathBuf),

    /// `server.json` exists but is not valid JSON (or has wrongly
    /// typed fields)
    #[error("cannot parse '{}'", .0.display())]
    ConfigParse(PathBuf),

    /// `server.json` parsed but a required key is absent
    #[error("cannot get server data: missing '{0}'")]
    ConfigIncomplete(&'static str),

    /// The user id is invalid or the user directory is unusable
    #[error("unknown user '{0}'")]
    UserNotFound(String),

    /// `key.json` is absent for an otherwise valid user
    #[error("error opening key file for user '{0}'")]
    KeyMissing(String),

    /// `key.json` exists but cannot be parsed
    #[error("cannot parse key file for user '{0}'")]
    KeyParse(String),

    /// On-disk layout predates the oldest supported version
    #[error("unsupported old disk layout {0:.1}")]
    UnsupportedLayout(f64),

    /// On-disk layout is newer than this build understands
    #[error("unknown future disk layout {0:.1}")]
    FutureLayout(f64),

    /// Filesystem error outside the per-file skip policy
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error outside the per-file skip policy
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
