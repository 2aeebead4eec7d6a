//! The metadata store (spec.md §4.2): an embedded SQL-capable engine
//! (SurrealDB, embedded via the `kv-surrealkv` local engine) holding
//! `versions`, `tags`, `branches`, `search_index`, and `storage_metadata`.
//!
//! Concurrency model (spec.md §5): every public method here opens its
//! work against the single long-lived embedded handle, serializes writes
//! behind `write_lock`, and commits in one round trip. There are no
//! long-lived transactions.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regex::RegexBuilder;
use surrealdb::engine::local::{Db, SurrealKv};
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::schema::{MAIN_BRANCH, SCHEMA};
use crate::types::{
    AdvancedSearchFilter, BranchRow, ChangeKind, ChangeResult, RecordOutcome, SearchResult,
    StorageMetadataRow, TagRow, VersionRow,
};
use crate::{Result, StoreError};

const LOCK_RETRY_ATTEMPTS: u32 = 5;
const LOCK_RETRY_BACKOFF_MS: u64 = 20;

/// Handle to the embedded metadata database for a single repository.
pub struct MetadataStore {
    db: Surreal<Db>,
    write_lock: Arc<Mutex<()>>,
}

impl MetadataStore {
    /// Open (creating if absent) the metadata store rooted at `db_path`
    /// (conventionally `<repo>/.chronolog/history.db`).
    #[instrument(skip_all)]
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db = Surreal::new::<SurrealKv>(db_path.as_ref().to_string_lossy().to_string())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        db.use_ns("chronolog")
            .use_db("history")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.db.query(SCHEMA).await?;

        let existing: Option<BranchRow> = self.get_branch(MAIN_BRANCH).await.ok().flatten();
        if existing.is_none() {
            let main = BranchRow {
                name: MAIN_BRANCH.to_string(),
                head_digest: String::new(),
                created_at: Utc::now(),
                parent_branch: None,
            };
            let _: Option<BranchRow> = self.db.create("branches").content(main).await?;
        }
        Ok(())
    }

    /// Retry a write closure a bounded number of times on lock contention
    /// (spec.md §4.2, §7: `LockContention` is transient and internally
    /// retried before surfacing).
    async fn with_write_lock<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let _guard = self.write_lock.lock().await;
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(StoreError::Query(msg)) if is_lock_contention(&msg) && attempt < LOCK_RETRY_ATTEMPTS => {
                    attempt += 1;
                    warn!(attempt, "metadata store lock contention, retrying");
                    tokio::time::sleep(Duration::from_millis(LOCK_RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
                Err(StoreError::Query(msg)) if is_lock_contention(&msg) => {
                    return Err(StoreError::LockContention)
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ---------------------------------------------------------------
    // Revisions
    // ---------------------------------------------------------------

    /// Record that `file_path` contained `blob_digest` at this instant.
    ///
    /// No-ops (returns [`RecordOutcome::Deduped`]) if the identical
    /// `(file_path, blob_digest)` pair was already recorded (spec.md §3:
    /// "the same exact content for the same path is never recorded twice
    /// in succession").
    #[instrument(skip(self, search_text), fields(file_path))]
    pub async fn record_revision(
        &self,
        file_path: &str,
        blob_digest: &str,
        byte_size: u64,
        parent_digest: Option<String>,
        annotation: Option<String>,
        search_text: Option<String>,
        branch: &str,
    ) -> Result<RecordOutcome> {
        if let Some(existing) = self.find_version(file_path, blob_digest).await? {
            debug!("dedup: identical (path, digest) already recorded");
            return Ok(RecordOutcome::Deduped(existing));
        }

        let row = VersionRow {
            file_path: file_path.to_string(),
            blob_digest: blob_digest.to_string(),
            timestamp: Utc::now(),
            parent_digest,
            annotation,
            byte_size,
        };

        self.with_write_lock(|| async {
            let created: Option<VersionRow> =
                self.db.create("versions").content(row.clone()).await?;
            created.ok_or_else(|| StoreError::Query("failed to insert version row".into()))?;

            if let Some(text) = &search_text {
                let search_row = crate::types::SearchRow {
                    blob_digest: blob_digest.to_string(),
                    file_path: file_path.to_string(),
                    content_text: text.clone(),
                };
                let _: Option<crate::types::SearchRow> =
                    self.db.create("search_index").content(search_row).await?;
            }

            self.update_branch_head(branch, blob_digest).await?;
            Ok(row.clone())
        })
        .await
        .map(RecordOutcome::Recorded)
    }

    async fn find_version(&self, file_path: &str, blob_digest: &str) -> Result<Option<VersionRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM versions WHERE file_path = $path AND blob_digest = $digest LIMIT 1")
            .bind(("path", file_path.to_string()))
            .bind(("digest", blob_digest.to_string()))
            .await?;
        let rows: Vec<VersionRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// History for `file_path`, newest first.
    #[instrument(skip(self))]
    pub async fn file_history(&self, file_path: &str) -> Result<Vec<VersionRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM versions WHERE file_path = $path ORDER BY timestamp DESC")
            .bind(("path", file_path.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// All version rows, any order — used by `reindex` and integrity checks.
    pub async fn all_versions(&self) -> Result<Vec<VersionRow>> {
        let mut result = self.db.query("SELECT * FROM versions").await?;
        Ok(result.take(0)?)
    }

    /// The most recent version row recorded anywhere for `digest`, used by
    /// `diff`/`show` to find which file path a bare digest belongs to.
    #[instrument(skip(self))]
    pub async fn version_by_digest(&self, digest: &str) -> Result<Option<VersionRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM versions WHERE blob_digest = $d ORDER BY timestamp DESC LIMIT 1")
            .bind(("d", digest.to_string()))
            .await?;
        let rows: Vec<VersionRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// The single most recently recorded version across every path, used by
    /// `tag` when no digest is supplied (spec.md §4.4: "latest-revision").
    #[instrument(skip(self))]
    pub async fn latest_version(&self) -> Result<Option<VersionRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM versions ORDER BY timestamp DESC LIMIT 1")
            .await?;
        let rows: Vec<VersionRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Every row of `search_index`, used by `search_stats` to compute
    /// indexed-byte totals and per-extension breakdowns in-process.
    pub async fn all_search_rows(&self) -> Result<Vec<crate::types::SearchRow>> {
        let mut result = self.db.query("SELECT * FROM search_index").await?;
        Ok(result.take(0)?)
    }

    /// Resolve a digest prefix (≥1 char) against recorded blob digests.
    /// Fails `AmbiguousDigest` if >1 distinct digest matches, `RevisionNotFound`
    /// if none do.
    #[instrument(skip(self))]
    pub async fn resolve_digest(&self, prefix: &str) -> Result<String> {
        let mut result = self
            .db
            .query("SELECT blob_digest FROM versions WHERE string::starts_with(blob_digest, $prefix)")
            .bind(("prefix", prefix.to_string()))
            .await?;

        #[derive(serde::Deserialize)]
        struct Row {
            blob_digest: String,
        }
        let rows: Vec<Row> = result.take(0)?;
        let mut digests: Vec<String> = rows.into_iter().map(|r| r.blob_digest).collect();
        digests.sort();
        digests.dedup();

        match digests.len() {
            0 => Err(StoreError::RevisionNotFound(prefix.to_string())),
            1 => Ok(digests.into_iter().next().unwrap()),
            _ => Err(StoreError::AmbiguousDigest(prefix.to_string())),
        }
    }

    // ---------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_branch(&self, name: &str) -> Result<Option<BranchRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM branches WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let rows: Vec<BranchRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn list_branches(&self) -> Result<Vec<BranchRow>> {
        let mut result = self.db.query("SELECT * FROM branches ORDER BY name").await?;
        Ok(result.take(0)?)
    }

    #[instrument(skip(self))]
    pub async fn create_branch(&self, name: &str, from: &str) -> Result<BranchRow> {
        if self.get_branch(name).await?.is_some() {
            return Err(StoreError::BranchExists(name.to_string()));
        }
        let source = self
            .get_branch(from)
            .await?
            .ok_or_else(|| StoreError::BranchNotFound(from.to_string()))?;

        let row = BranchRow {
            name: name.to_string(),
            head_digest: source.head_digest,
            created_at: Utc::now(),
            parent_branch: Some(from.to_string()),
        };
        self.with_write_lock(|| async {
            let created: Option<BranchRow> = self.db.create("branches").content(row.clone()).await?;
            created.ok_or_else(|| StoreError::Query("failed to insert branch".into()))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_branch(&self, name: &str, current: &str) -> Result<()> {
        if name == MAIN_BRANCH {
            return Err(StoreError::CannotDeleteBranch(name.to_string()));
        }
        if name == current {
            return Err(StoreError::CannotDeleteBranch(name.to_string()));
        }
        if self.get_branch(name).await?.is_none() {
            return Err(StoreError::BranchNotFound(name.to_string()));
        }
        self.with_write_lock(|| async {
            self.db
                .query("DELETE branches WHERE name = $name")
                .bind(("name", name.to_string()))
                .await?;
            Ok(())
        })
        .await
    }

    async fn update_branch_head(&self, name: &str, digest: &str) -> Result<()> {
        self.db
            .query("UPDATE branches SET head_digest = $digest WHERE name = $name")
            .bind(("digest", digest.to_string()))
            .bind(("name", name.to_string()))
            .await?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_tag(
        &self,
        name: &str,
        digest: &str,
        description: Option<String>,
    ) -> Result<TagRow> {
        if self.get_tag(name).await?.is_some() {
            return Err(StoreError::TagExists(name.to_string()));
        }
        let row = TagRow {
            name: name.to_string(),
            blob_digest: digest.to_string(),
            timestamp: Utc::now(),
            description,
        };
        self.with_write_lock(|| async {
            let created: Option<TagRow> = self.db.create("tags").content(row.clone()).await?;
            created.ok_or_else(|| StoreError::Query("failed to insert tag".into()))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_tag(&self, name: &str) -> Result<Option<TagRow>> {
        let mut result = self
            .db
            .query("SELECT * FROM tags WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let rows: Vec<TagRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<TagRow>> {
        let mut result = self.db.query("SELECT * FROM tags ORDER BY name").await?;
        Ok(result.take(0)?)
    }

    #[instrument(skip(self))]
    pub async fn delete_tag(&self, name: &str) -> Result<()> {
        if self.get_tag(name).await?.is_none() {
            return Err(StoreError::TagNotFound(name.to_string()));
        }
        self.with_write_lock(|| async {
            self.db
                .query("DELETE tags WHERE name = $name")
                .bind(("name", name.to_string()))
                .await?;
            Ok(())
        })
        .await
    }

    // ---------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------

    /// Substring `LIKE` search over indexed text, newest first.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, file: Option<&str>) -> Result<Vec<SearchResult>> {
        let filter = AdvancedSearchFilter {
            query: query.to_string(),
            file_paths: file.map(|f| vec![f.to_string()]).unwrap_or_default(),
            ..Default::default()
        };
        self.advanced_search(&filter).await
    }

    /// Filtered search. Regex/whole-word matching is evaluated in-process
    /// over a bounded candidate set pulled from `search_index` (spec.md §9:
    /// "alternative is to pull rows and filter in-process"), rather than
    /// via a registered SQL function, to keep the query surface in plain
    /// SurrealQL.
    #[instrument(skip(self))]
    pub async fn advanced_search(&self, filter: &AdvancedSearchFilter) -> Result<Vec<SearchResult>> {
        let mut sql = String::from("SELECT * FROM search_index");
        let mut clauses: Vec<String> = Vec::new();
        if !filter.file_paths.is_empty() {
            clauses.push("file_path IN $file_paths".to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut q = self.db.query(sql);
        if !filter.file_paths.is_empty() {
            q = q.bind(("file_paths", filter.file_paths.clone()));
        }
        let mut result = q.await?;
        let rows: Vec<crate::types::SearchRow> = result.take(0)?;

        let matcher = build_matcher(filter)?;
        let mut hits: Vec<SearchResult> = Vec::new();
        for row in rows {
            if !filter.file_types.is_empty() {
                let matches_type = filter
                    .file_types
                    .iter()
                    .any(|ext| row.file_path.ends_with(ext.trim_start_matches('.')));
                if !matches_type {
                    continue;
                }
            }
            if let Some(pos) = matcher.find(&row.content_text) {
                let timestamp = self
                    .version_timestamp(&row.file_path, &row.blob_digest)
                    .await?
                    .unwrap_or_else(Utc::now);
                if let Some(from) = filter.date_from {
                    if timestamp < from {
                        continue;
                    }
                }
                if let Some(to) = filter.date_to {
                    if timestamp > to {
                        continue;
                    }
                }
                hits.push(SearchResult {
                    blob_digest: row.blob_digest.clone(),
                    file_path: row.file_path.clone(),
                    timestamp,
                    snippet: snippet_around(&row.content_text, pos),
                });
            }
        }
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn version_timestamp(
        &self,
        file_path: &str,
        digest: &str,
    ) -> Result<Option<chrono::DateTime<Utc>>> {
        Ok(self
            .find_version(file_path, digest)
            .await?
            .map(|v| v.timestamp))
    }

    /// For each file, walk adjacent revisions chronologically and emit a
    /// hit when `added`/`removed` text appears/disappears between them
    /// (spec.md §4.4).
    #[instrument(skip(self))]
    pub async fn search_changes(
        &self,
        added: Option<&str>,
        removed: Option<&str>,
    ) -> Result<Vec<ChangeResult>> {
        let all = self.all_versions().await?;
        let mut by_path: std::collections::BTreeMap<String, Vec<VersionRow>> =
            std::collections::BTreeMap::new();
        for row in all {
            by_path.entry(row.file_path.clone()).or_default().push(row);
        }

        let mut out = Vec::new();
        for (_path, mut revs) in by_path {
            revs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            for pair in revs.windows(2) {
                let (older, newer) = (&pair[0], &pair[1]);
                let older_text = self.content_text(&older.blob_digest, &older.file_path).await?;
                let newer_text = self.content_text(&newer.blob_digest, &newer.file_path).await?;

                if let Some(needle) = added {
                    let had = older_text.as_deref().is_some_and(|t| t.contains(needle));
                    let has = newer_text.as_deref().is_some_and(|t| t.contains(needle));
                    if has && !had {
                        out.push(ChangeResult {
                            file_path: newer.file_path.clone(),
                            kind: ChangeKind::Added,
                            needle: needle.to_string(),
                            older_digest: older.blob_digest.clone(),
                            newer_digest: newer.blob_digest.clone(),
                            timestamp: newer.timestamp,
                        });
                    }
                }
                if let Some(needle) = removed {
                    let had = older_text.as_deref().is_some_and(|t| t.contains(needle));
                    let has = newer_text.as_deref().is_some_and(|t| t.contains(needle));
                    if had && !has {
                        out.push(ChangeResult {
                            file_path: newer.file_path.clone(),
                            kind: ChangeKind::Removed,
                            needle: needle.to_string(),
                            older_digest: older.blob_digest.clone(),
                            newer_digest: newer.blob_digest.clone(),
                            timestamp: newer.timestamp,
                        });
                    }
                }
            }
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    async fn content_text(&self, digest: &str, file_path: &str) -> Result<Option<String>> {
        let mut result = self
            .db
            .query("SELECT content_text FROM search_index WHERE blob_digest = $d AND file_path = $p LIMIT 1")
            .bind(("d", digest.to_string()))
            .bind(("p", file_path.to_string()))
            .await?;
        #[derive(serde::Deserialize)]
        struct Row {
            content_text: String,
        }
        let rows: Vec<Row> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.content_text))
    }

    // ---------------------------------------------------------------
    // Storage metadata / integrity
    // ---------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn touch_storage_metadata(&self, digest: &str, size: u64) -> Result<()> {
        let mut existing = self
            .db
            .query("SELECT * FROM storage_metadata WHERE digest = $d LIMIT 1")
            .bind(("d", digest.to_string()))
            .await?;
        let rows: Vec<StorageMetadataRow> = existing.take(0)?;

        if let Some(mut row) = rows.into_iter().next() {
            row.access_count += 1;
            row.last_accessed = Utc::now();
            self.db
                .query("UPDATE storage_metadata SET access_count = $ac, last_accessed = $la WHERE digest = $d")
                .bind(("ac", row.access_count))
                .bind(("la", row.last_accessed))
                .bind(("d", digest.to_string()))
                .await?;
        } else {
            let row = StorageMetadataRow {
                digest: digest.to_string(),
                size,
                compression_ratio: None,
                access_count: 1,
                last_accessed: Utc::now(),
                is_orphaned: false,
            };
            let _: Option<StorageMetadataRow> =
                self.db.create("storage_metadata").content(row).await?;
        }
        Ok(())
    }

    /// Clear and rebuild `search_index` from every recorded version's blob
    /// text, supplied by the caller (the repository owns blob retrieval).
    /// Idempotent: running twice yields the same rows (spec.md §8).
    pub async fn rebuild_search_index<'a, I>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        self.db.query("DELETE search_index").await?;
        let mut count = 0;
        for (digest, path, text) in rows {
            let search_row = crate::types::SearchRow {
                blob_digest: digest,
                file_path: path,
                content_text: text,
            };
            let _: Option<crate::types::SearchRow> =
                self.db.create("search_index").content(search_row).await?;
            count += 1;
        }
        Ok(count)
    }
}

fn is_lock_contention(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("lock") || lower.contains("busy") || lower.contains("conflict")
}

enum Matcher {
    Substring { needle: String, case_sensitive: bool },
    Regex(regex::Regex),
}

impl Matcher {
    fn find(&self, haystack: &str) -> Option<usize> {
        match self {
            Matcher::Substring { needle, case_sensitive } => {
                if *case_sensitive {
                    haystack.find(needle.as_str())
                } else {
                    haystack.to_lowercase().find(&needle.to_lowercase())
                }
            }
            Matcher::Regex(re) => re.find(haystack).map(|m| m.start()),
        }
    }
}

/// Build the in-process matcher for a filter. Regex honors `case_sensitive`
/// (default false ⇒ case-insensitive); whole-word matching is implemented
/// as a regex with `\b` boundaries (spec.md §4.4, §9).
fn build_matcher(filter: &AdvancedSearchFilter) -> Result<Matcher> {
    if filter.regex || filter.whole_words {
        let pattern = if filter.whole_words && !filter.regex {
            format!(r"\b{}\b", regex::escape(&filter.query))
        } else if filter.whole_words {
            format!(r"\b(?:{})\b", filter.query)
        } else {
            filter.query.clone()
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(!filter.case_sensitive)
            .build()
            .map_err(|e| StoreError::InvalidRegex(e.to_string()))?;
        Ok(Matcher::Regex(re))
    } else {
        Ok(Matcher::Substring {
            needle: filter.query.clone(),
            case_sensitive: filter.case_sensitive,
        })
    }
}

/// Extract up to ~50 chars around `pos`, delimited by `<mark>`/`</mark>`.
fn snippet_around(text: &str, pos: usize) -> String {
    const WINDOW: usize = 25;
    let start = pos.saturating_sub(WINDOW);
    let end = (pos + WINDOW).min(text.len());
    let start = floor_char_boundary(text, start);
    let end = ceil_char_boundary(text, end);
    let mark_point = pos.min(end.saturating_sub(1)).max(start);
    let before = &text[start..mark_point.min(end)];
    let after = &text[mark_point.min(end)..end];
    format!("{before}<mark>{after}</mark>")
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
