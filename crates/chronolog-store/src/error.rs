//! Error types for the metadata store.

use thiserror::Error;

/// Errors surfaced by the metadata store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("database query failed: {0}")]
    Query(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("cannot delete branch: {0}")]
    CannotDeleteBranch(String),

    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("tag already exists: {0}")]
    TagExists(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("ambiguous digest prefix: {0}")]
    AmbiguousDigest(String),

    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    #[error("lock contention exceeded retry budget")]
    LockContention,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
