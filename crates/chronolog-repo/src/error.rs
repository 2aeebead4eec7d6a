//! The single typed error enum at the Repository API boundary (spec.md §7
//! `[FULL]`), following the teacher's pattern of one `thiserror`-derived
//! enum per crate with `#[from]` conversions from lower-layer errors.
//! Binaries wrap this in `anyhow::Result` at their outermost frame only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChronoLogError {
    #[error("not a chronolog repository: {0}")]
    NotARepository(String),

    #[error("repository already exists at {0}")]
    RepositoryExists(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("ambiguous digest prefix: {0}")]
    AmbiguousDigest(String),

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

    #[error("binary file diff requested in text mode")]
    BinaryFileDiff,

    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    #[error("lock contention exceeded retry budget")]
    LockContention,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("object store error: {0}")]
    Cas(#[from] chronolog_core::CasError),

    #[error("daemon supervisor error: {0}")]
    Supervisor(#[from] chronolog_core::supervisor::SupervisorError),

    #[error("internal runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, ChronoLogError>;

impl From<chronolog_store::StoreError> for ChronoLogError {
    fn from(err: chronolog_store::StoreError) -> Self {
        use chronolog_store::StoreError as S;
        match err {
            S::BranchNotFound(n) => ChronoLogError::BranchNotFound(n),
            S::BranchExists(n) => ChronoLogError::BranchExists(n),
            S::CannotDeleteBranch(n) => ChronoLogError::CannotDeleteBranch(n),
            S::TagNotFound(n) => ChronoLogError::TagNotFound(n),
            S::TagExists(n) => ChronoLogError::TagExists(n),
            S::RevisionNotFound(d) => ChronoLogError::RevisionNotFound(d),
            S::AmbiguousDigest(d) => ChronoLogError::AmbiguousDigest(d),
            S::InvalidRegex(r) => ChronoLogError::InvalidRegex(r),
            S::LockContention => ChronoLogError::LockContention,
            S::Io(e) => ChronoLogError::IOError(e),
            other => ChronoLogError::Runtime(other.to_string()),
        }
    }
}
