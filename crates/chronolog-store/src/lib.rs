//! chronolog-store: the embedded metadata store (spec.md §4.2).
//!
//! Holds the indexed relational record of versions, branches, tags, the
//! full-text search index, and storage metrics, backed by an embedded
//! SurrealDB instance (`kv-surrealkv` local engine). The current-branch
//! marker is a sibling file, not a table — see [`current_branch`].

mod current_branch;
mod error;
mod metadata;
mod schema;
mod types;

pub use current_branch::CurrentBranchMarker;
pub use error::StoreError;
pub use metadata::MetadataStore;
pub use schema::MAIN_BRANCH;
pub use types::{
    AdvancedSearchFilter, BranchRow, ChangeKind, ChangeResult, RecordOutcome, SearchResult,
    StorageMetadataRow, TagRow, VersionRow,
};

pub type Result<T> = std::result::Result<T, StoreError>;
