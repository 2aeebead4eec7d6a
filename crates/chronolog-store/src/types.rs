//! Row types for the metadata store tables (see spec.md §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row in the `versions` table: one recorded revision of a file path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionRow {
    pub file_path: String,
    pub blob_digest: String,
    pub timestamp: DateTime<Utc>,
    pub parent_digest: Option<String>,
    pub annotation: Option<String>,
    pub byte_size: u64,
}

/// A row in the `branches` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchRow {
    pub name: String,
    pub head_digest: String,
    pub created_at: DateTime<Utc>,
    pub parent_branch: Option<String>,
}

/// A row in the `tags` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRow {
    pub name: String,
    pub blob_digest: String,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

/// A row in the `search_index` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRow {
    pub blob_digest: String,
    pub file_path: String,
    pub content_text: String,
}

/// A row in the `storage_metadata` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageMetadataRow {
    pub digest: String,
    pub size: u64,
    pub compression_ratio: Option<f64>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub is_orphaned: bool,
}

/// Outcome of [`crate::metadata::MetadataStore::record_revision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new `versions` row was inserted.
    Recorded(VersionRow),
    /// The `(file_path, blob_digest)` pair already existed; no-op.
    Deduped(VersionRow),
}

impl RecordOutcome {
    pub fn row(&self) -> &VersionRow {
        match self {
            RecordOutcome::Recorded(r) | RecordOutcome::Deduped(r) => r,
        }
    }
}

/// Filter accepted by `advanced_search` (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct AdvancedSearchFilter {
    pub query: String,
    pub regex: bool,
    pub case_sensitive: bool,
    pub whole_words: bool,
    pub file_paths: Vec<String>,
    pub file_types: Vec<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// A single search hit, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub blob_digest: String,
    pub file_path: String,
    pub timestamp: DateTime<Utc>,
    /// Up to ~50 chars around the match, delimited by `<mark>...</mark>`.
    pub snippet: String,
}

/// Direction of a change detected by `search_changes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
}

/// A hit from `search_changes`: some text appeared or disappeared between
/// two adjacent revisions of the same file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeResult {
    pub file_path: String,
    pub kind: ChangeKind,
    pub needle: String,
    pub older_digest: String,
    pub newer_digest: String,
    pub timestamp: DateTime<Utc>,
}
