use std::path::PathBuf;

use thiserror::Error;

use crate::models::SourceType;

/// A source could not enumerate anything at all for one application.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_type}: unable to read {}: {reason}", .path.display())]
    Manifest {
        source_type: SourceType,
        path: PathBuf,
        reason: String,
    },

    #[error("`{command}` failed: {reason}")]
    Command { command: String, reason: String },
}

/// Failure to load a cache record from disk.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cache record not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed cache record {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to read cache record {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure to persist a cache record. The destination is left untouched.
#[derive(Debug, Error)]
pub enum CacheWriteError {
    #[error("refusing to write record for {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
