//! Error taxonomy for the indexing pipeline, store and graph engine.
//!
//! Library code never panics or swallows errors silently; it returns one of
//! the typed enums below and propagates with `?`. Only the CLI shell (the
//! process boundary, out of scope for core correctness) turns a fatal error
//! into a one-line diagnostic and a process exit code.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{FileId, SymbolId};

/// Errors from the persistent store (schema, connection, constraints).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error during {operation}: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error(
        "index schema version {found} is newer than the version this build supports ({supported}); upgrade the binary"
    )]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("failed to acquire writer lock at '{path}': held by pid {holder_pid}")]
    LockContention { path: PathBuf, holder_pid: u32 },

    #[error("failed to acquire writer lock at '{path}': {reason}")]
    LockIo { path: PathBuf, reason: String },

    #[error("store connection lost; there is no reconnect path, the current process must exit")]
    ConnectionLost,
}

impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        StoreError::Sqlite { operation: "query", source }
    }
}

/// Errors from a single-language extractor. Always scoped to one file; the
/// indexer recovers from these by counting the file as errored and moving on.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("tree-sitter grammar failed to initialize for {language}: {reason}")]
    GrammarInit { language: &'static str, reason: String },

    #[error("{language} parse of '{path}' failed: {reason}")]
    Failed {
        path: PathBuf,
        language: &'static str,
        reason: String,
    },

    #[error("source is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors surfaced by graph traversal. Resolution misses are not errors per
/// the spec (§7) — they come back as empty results — so this type only
/// covers genuinely exceptional conditions.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("store error during traversal: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced while shaping a pack. A budget too small to fit even an
/// identity block is not an error (§7) — it degrades to a minimal pack — so
/// this type only covers store/graph failures encountered while building one.
#[derive(Error, Debug)]
pub enum PackError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Top-level error for a fatal indexing run. Per-file problems never reach
/// this type; they are folded into `IndexStats` instead.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("symbol '{name}' not found")]
    SymbolNotFound { name: String },

    #[error("file id {id} not found in index")]
    FileNotFound { id: FileId },

    #[error("symbol id {id} not found in index")]
    SymbolIdNotFound { id: SymbolId },

    #[error("indexing was cancelled after {files_completed} files")]
    Cancelled { files_completed: usize },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl IndexError {
    /// Recovery suggestions surfaced alongside the one-line diagnostic the
    /// CLI shell prints for a fatal error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            IndexError::Store(StoreError::SchemaTooNew { .. }) => vec![
                "This index was created by a newer version of pui",
                "Upgrade pui, or delete .pui/ and run `pui index` again to rebuild",
            ],
            IndexError::Store(StoreError::LockContention { .. }) => vec![
                "Another pui process is currently indexing this repository",
                "Wait for it to finish, or remove .pui/index.lock if that process is dead",
            ],
            IndexError::FileRead { .. } => vec!["Check that the file exists and is readable"],
            _ => vec![],
        }
    }

    /// Exit code this error maps to at the CLI boundary (§6).
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexError::Store(StoreError::SchemaTooNew { .. }) => 2,
            _ => 1,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type GraphResult<T> = Result<T, GraphError>;
pub type PackResult<T> = Result<T, PackError>;
