//! Public result types for Repository API operations that don't already
//! have a natural home in `chronolog-store`'s row types.

use serde::{Deserialize, Serialize};

/// Outcome of [`crate::Repository::reindex`] and [`crate::Repository::search_stats`]
/// (spec.md §4.4 `[FULL]`, grounded in `searcher.py::reindex_all`/`get_search_stats`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
    pub indexed_count: usize,
    pub total_count: usize,
    pub index_size_bytes: usize,
    /// (extension, count), most-indexed first, capped at 10 entries.
    pub file_types: Vec<(String, usize)>,
}

/// One corrupt row surfaced by [`crate::Repository::integrity_check`]: a
/// `versions`/`tags` row whose digest has no object on disk, or whose
/// object's re-hash doesn't match (spec.md §4.2 `[FULL]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorruptRow {
    pub blob_digest: String,
    pub reason: CorruptReason,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CorruptReason {
    MissingObject,
    HashMismatch,
}

/// Summary returned by an integrity check pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub checked: usize,
    pub corrupt: Vec<CorruptRow>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty()
    }
}

/// `(current_branch_name, all_branches)` — the zero-argument shape of
/// `branch()` (spec.md §4.4).
pub type BranchOverview = (String, Vec<chronolog_store::BranchRow>);
