// Error taxonomy for indexing, snapshots and queries

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors surfaced to callers of the indexer, snapshot store and query engine.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("project root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("project root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("cannot load index from {path}: {source}")]
    SnapshotUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode index snapshot {path}: {source}")]
    SnapshotDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("index snapshot {path} is inconsistent: {reason}")]
    SnapshotMismatch { path: PathBuf, reason: String },

    #[error("cannot write index snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown component kind: {0}")]
    UnknownKind(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexError {
    /// True for errors caused by the caller's arguments rather than engine state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IndexError::UnknownKind(_) | IndexError::InvalidArgument(_)
        )
    }

    /// True when the index could not be obtained at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            IndexError::SnapshotUnavailable { .. }
                | IndexError::SnapshotDecode { .. }
                | IndexError::SnapshotMismatch { .. }
                | IndexError::RootNotFound(_)
                | IndexError::RootNotDirectory(_)
        )
    }
}

/// Failure to turn a single file into components. Never fatal for a run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("syntax error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("parser setup failed: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

/// A per-file failure recorded during an indexing run.
#[derive(Debug)]
pub struct FileError {
    pub path: String,
    pub error: ExtractError,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}
