//! chronolog-repo: the Repository façade (spec.md §4.4, C4) tying the
//! object store, ignore engine, and daemon supervisor (`chronolog-core`)
//! together with the metadata store (`chronolog-store`) behind one
//! synchronous API.
//!
//! `chronolog-store`'s driver is async (SurrealDB). Rather than push async
//! through every caller — the CLI, the watcher, and eventually a web UI all
//! want a plain function call — [`Repository`] owns a current-thread
//! `tokio::runtime::Runtime` and blocks on every store call. This mirrors
//! how the original Python implementation wraps its storage layer behind a
//! single-threaded façade (`api.py::ChronologRepo`).

mod daemon;
pub mod error;
mod paths;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chronolog_core::{CasStore, Digest, FsCasStore, IgnoreEngine};
use chronolog_store::{
    AdvancedSearchFilter, BranchRow, ChangeResult, CurrentBranchMarker, MetadataStore,
    RecordOutcome, SearchResult, TagRow, MAIN_BRANCH,
};
use tracing::instrument;

pub use chronolog_core::diff::{DiffHeader, DiffKind, DiffOutput};
pub use chronolog_merge::{ConflictResolution, MergeKind, MergeResult};
pub use error::{ChronoLogError, Result};
pub use paths::META_DIR_NAME;
pub use types::{BranchOverview, CorruptReason, CorruptRow, IntegrityReport, SearchStats};

const OBJECTS_SUBDIR: &str = "objects";
const DB_SUBDIR: &str = "db";

/// A progress callback invoked with `(done, total)`, used by long-running
/// scans (`reindex`, `integrity_check`) so a CLI can render a progress bar.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// The result of running a diff between two recorded revisions, or between
/// a revision and the file's current on-disk content.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub file_path: String,
    pub digest_a: String,
    /// `None` when diffing against the working copy (`current = true`).
    pub digest_b: Option<String>,
    pub output: DiffOutput,
}

/// An open ChronoLog repository: `<root>/.chronolog/{objects,db,current_branch}`.
pub struct Repository {
    root: PathBuf,
    meta_dir: PathBuf,
    cas: FsCasStore,
    store: MetadataStore,
    current_branch: CurrentBranchMarker,
    ignore: Mutex<IgnoreEngine>,
    rt: tokio::runtime::Runtime,
}

impl Repository {
    /// Initialize a new repository at `path`, failing if one already exists
    /// there (spec.md §4.4 `init`).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let meta_dir = root.join(META_DIR_NAME);
        if meta_dir.is_dir() {
            return Err(ChronoLogError::RepositoryExists(root.display().to_string()));
        }
        fs::create_dir_all(&meta_dir)?;
        chronolog_core::ignore::write_default_ignore_file(&root)?;
        let repo = Self::open_at(root, meta_dir)?;
        // Best-effort: a repository is still usable without the daemon
        // running (spec.md §4.4 `init`), so a spawn failure is logged, not
        // propagated.
        if let Err(e) = repo.start_daemon() {
            tracing::warn!(error = %e, "failed to spawn watcher daemon during init");
        }
        Ok(repo)
    }

    /// Open an existing repository rooted exactly at `path` (no ancestor
    /// search — use [`Repository::discover`] for that).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let meta_dir = root.join(META_DIR_NAME);
        if !meta_dir.is_dir() {
            return Err(ChronoLogError::NotARepository(root.display().to_string()));
        }
        Self::open_at(root, meta_dir)
    }

    /// Walk upward from `start` looking for `.chronolog`, then open it
    /// (spec.md §4.4: commands run from any subdirectory of a repository).
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let root = paths::find_repo_root(start.as_ref())
            .ok_or_else(|| ChronoLogError::NotARepository(start.as_ref().display().to_string()))?;
        Self::open(root)
    }

    fn open_at(root: PathBuf, meta_dir: PathBuf) -> Result<Self> {
        let cas = FsCasStore::new(meta_dir.join(OBJECTS_SUBDIR))?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ChronoLogError::Runtime(e.to_string()))?;
        let store = rt.block_on(MetadataStore::open(meta_dir.join(DB_SUBDIR)))?;
        let current_branch = CurrentBranchMarker::new(&meta_dir);
        current_branch.init()?;
        let ignore = Mutex::new(IgnoreEngine::load(&root));

        Ok(Self { root, meta_dir, cas, store, current_branch, ignore, rt })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Normalize `path` to a repo-relative, forward-slash string. Exposed
    /// so the watcher daemon can map raw filesystem events back onto the
    /// same path shape used by `record_file`/`log`.
    pub fn relative(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(paths::normalize_relative(&self.root, path.as_ref())?)
    }

    fn latest_digest_for_path(&self, file_path: &str) -> Result<Option<String>> {
        let history = self.rt.block_on(self.store.file_history(file_path))?;
        Ok(history.into_iter().next().map(|v| v.blob_digest))
    }

    /// Write `bytes` to the object store and record a new revision of
    /// `file_path` on the current branch, auto-filling the parent digest
    /// from that path's own history (spec.md §4.4 `[FULL]`, grounded in
    /// `storage.py::store_version`). Used by the CLI's implicit commit and
    /// by the watcher daemon.
    #[instrument(skip(self, bytes), fields(file_path))]
    pub fn record_file(
        &self,
        file_path: &str,
        bytes: &[u8],
        annotation: Option<String>,
    ) -> Result<RecordOutcome> {
        let parent = self.latest_digest_for_path(file_path)?;
        self.record_with_parent(file_path, bytes, parent, annotation)
    }

    fn record_with_parent(
        &self,
        file_path: &str,
        bytes: &[u8],
        parent_digest: Option<String>,
        annotation: Option<String>,
    ) -> Result<RecordOutcome> {
        let digest = self.cas.put(bytes)?;
        let digest_hex = digest.to_hex();
        let search_text = String::from_utf8(bytes.to_vec()).ok();
        let branch = self.current_branch.get()?;

        let outcome = self.rt.block_on(self.store.record_revision(
            file_path,
            &digest_hex,
            bytes.len() as u64,
            parent_digest,
            annotation,
            search_text,
            &branch,
        ))?;

        if matches!(outcome, RecordOutcome::Recorded(_)) {
            self.rt
                .block_on(self.store.touch_storage_metadata(&digest_hex, bytes.len() as u64))?;
        }
        Ok(outcome)
    }

    /// Full history of `file_path`, newest first (spec.md §4.4 `log`).
    #[instrument(skip(self))]
    pub fn log(&self, file_path: impl AsRef<Path>) -> Result<Vec<chronolog_store::VersionRow>> {
        let rel = self.relative(file_path)?;
        Ok(self.rt.block_on(self.store.file_history(&rel))?)
    }

    /// Resolve a digest or unambiguous prefix to its full 64-char hex form.
    #[instrument(skip(self))]
    pub fn resolve_digest(&self, prefix: &str) -> Result<String> {
        Ok(self.rt.block_on(self.store.resolve_digest(prefix))?)
    }

    /// The raw bytes recorded under `digest_or_prefix` (spec.md §4.4 `show`).
    #[instrument(skip(self))]
    pub fn show(&self, digest_or_prefix: &str) -> Result<Vec<u8>> {
        let full = self.resolve_digest(digest_or_prefix)?;
        let digest: Digest = full.parse()?;
        Ok(self.cas.get(&digest)?)
    }

    /// Diff revision `a` against revision `b`, or against the working copy
    /// when `current` is `true` (spec.md §4.4 `[FULL]`). Exactly one of `b`
    /// or `current` must be given, matching `api.py::diff`'s
    /// `ValueError("Second version hash required (or use current=True)")`.
    #[instrument(skip(self))]
    pub fn diff(
        &self,
        a: &str,
        b: Option<&str>,
        current: bool,
        kind: DiffKind,
    ) -> Result<DiffReport> {
        let digest_a = self.resolve_digest(a)?;
        let version_a = self
            .rt
            .block_on(self.store.version_by_digest(&digest_a))?
            .ok_or_else(|| ChronoLogError::RevisionNotFound(a.to_string()))?;
        let content_a = self.cas.get(&digest_a.parse()?)?;

        let (content_b, digest_b) = if current {
            let abs = self.root.join(&version_a.file_path);
            let bytes = fs::read(&abs).map_err(ChronoLogError::IOError)?;
            (bytes, None)
        } else {
            let b = b.ok_or_else(|| {
                ChronoLogError::InvalidArgument(
                    "second revision required unless --current is given".into(),
                )
            })?;
            let digest_b = self.resolve_digest(b)?;
            let bytes = self.cas.get(&digest_b.parse()?)?;
            (bytes, Some(digest_b))
        };

        let header = DiffHeader {
            path: Some(version_a.file_path.clone()),
            digest_a: Some(digest_a.clone()),
            digest_b: digest_b.clone(),
        };
        let output = chronolog_core::run_diff(kind, &content_a, &content_b, &header);

        Ok(DiffReport { file_path: version_a.file_path, digest_a, digest_b, output })
    }

    /// Restore `file` on disk to the content recorded under `digest`,
    /// bracketing the restore with two book-end revisions: a backup of
    /// whatever is currently on disk (no parent, matching
    /// `api.py::checkout`'s unset `parent_hash`), then the restored content
    /// with `parent_digest` set to the digest being checked out.
    #[instrument(skip(self))]
    pub fn checkout(&self, digest: &str, file: impl AsRef<Path>) -> Result<()> {
        let full = self.resolve_digest(digest)?;
        let content = self.cas.get(&full.parse()?)?;
        let rel = self.relative(file.as_ref())?;
        let abs = self.root.join(&rel);

        if abs.exists() {
            let current_bytes = fs::read(&abs)?;
            self.record_with_parent(
                &rel,
                &current_bytes,
                None,
                Some(format!("Before checkout to {}", &full[..8])),
            )?;
        }

        if let Some(parent_dir) = abs.parent() {
            fs::create_dir_all(parent_dir)?;
        }
        fs::write(&abs, &content)?;

        self.record_with_parent(
            &rel,
            &content,
            Some(full.clone()),
            Some(format!("Checked out from {}", &full[..8])),
        )?;
        Ok(())
    }

    /// Three-way merge of the revisions recorded under `base`, `ours`, and
    /// `theirs` (spec.md §4.6, C6 — exposed here since the merge engine
    /// itself is pure and has no store/CAS access of its own). `path` is
    /// passed through to [`chronolog_merge::MergeResult::metadata`] for
    /// display purposes only.
    #[instrument(skip(self))]
    pub fn merge(
        &self,
        base: &str,
        ours: &str,
        theirs: &str,
        path: Option<&str>,
    ) -> Result<chronolog_merge::MergeResult> {
        let base_bytes = self.show(base)?;
        let ours_bytes = self.show(ours)?;
        let theirs_bytes = self.show(theirs)?;
        Ok(chronolog_merge::merge(&base_bytes, &ours_bytes, &theirs_bytes, path))
    }

    // -----------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------

    /// Create a tag pointing at `digest`, or at the most recently recorded
    /// revision across the whole repository when `digest` is `None`
    /// (spec.md §4.4 `tag create`).
    #[instrument(skip(self))]
    pub fn tag_create(
        &self,
        name: &str,
        digest: Option<&str>,
        description: Option<String>,
    ) -> Result<TagRow> {
        let full = match digest {
            Some(d) => self.resolve_digest(d)?,
            None => self
                .rt
                .block_on(self.store.latest_version())?
                .ok_or_else(|| {
                    ChronoLogError::InvalidArgument("no revisions recorded yet".into())
                })?
                .blob_digest,
        };
        Ok(self.rt.block_on(self.store.create_tag(name, &full, description))?)
    }

    pub fn tag_list(&self) -> Result<Vec<TagRow>> {
        Ok(self.rt.block_on(self.store.list_tags())?)
    }

    pub fn tag_delete(&self, name: &str) -> Result<()> {
        Ok(self.rt.block_on(self.store.delete_tag(name))?)
    }

    // -----------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------

    pub fn branch_create(&self, name: &str, from: Option<&str>) -> Result<BranchRow> {
        let source = match from {
            Some(f) => f.to_string(),
            None => self.current_branch.get()?,
        };
        Ok(self.rt.block_on(self.store.create_branch(name, &source))?)
    }

    /// `(current branch name, every branch)` — the zero-argument shape of
    /// `branch()` (spec.md §4.4).
    pub fn branch_overview(&self) -> Result<BranchOverview> {
        let current = self.current_branch.get()?;
        let branches = self.rt.block_on(self.store.list_branches())?;
        Ok((current, branches))
    }

    pub fn switch_branch(&self, name: &str) -> Result<()> {
        if self.rt.block_on(self.store.get_branch(name))?.is_none() {
            return Err(ChronoLogError::BranchNotFound(name.to_string()));
        }
        self.current_branch.set(name)?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let current = self.current_branch.get()?;
        Ok(self.rt.block_on(self.store.delete_branch(name, &current))?)
    }

    // -----------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------

    pub fn search(&self, query: &str, file: Option<&str>) -> Result<Vec<SearchResult>> {
        Ok(self.rt.block_on(self.store.search(query, file))?)
    }

    pub fn advanced_search(&self, filter: &AdvancedSearchFilter) -> Result<Vec<SearchResult>> {
        Ok(self.rt.block_on(self.store.advanced_search(filter))?)
    }

    pub fn search_changes(
        &self,
        added: Option<&str>,
        removed: Option<&str>,
    ) -> Result<Vec<ChangeResult>> {
        Ok(self.rt.block_on(self.store.search_changes(added, removed))?)
    }

    /// Rebuild the full-text search index from every recorded revision's
    /// blob, skipping any blob that doesn't decode as UTF-8 (spec.md §4.4
    /// `reindex`, grounded in `searcher.py::reindex_all`). Returns
    /// `(indexed, total)`.
    #[instrument(skip(self, progress))]
    pub fn reindex(&self, mut progress: Option<ProgressFn<'_>>) -> Result<(usize, usize)> {
        let mut versions = self.rt.block_on(self.store.all_versions())?;
        versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let total = versions.len();

        let mut rows = Vec::new();
        for (i, v) in versions.iter().enumerate() {
            if let Ok(digest) = v.blob_digest.parse::<Digest>() {
                if let Ok(bytes) = self.cas.get(&digest) {
                    if let Ok(text) = String::from_utf8(bytes) {
                        rows.push((v.blob_digest.clone(), v.file_path.clone(), text));
                    }
                }
            }
            if let Some(cb) = progress.as_deref_mut() {
                cb(i + 1, total);
            }
        }
        let indexed = rows.len();
        self.rt.block_on(self.store.rebuild_search_index(rows))?;
        Ok((indexed, total))
    }

    /// Index size and per-extension breakdown of indexed paths (spec.md
    /// §4.4 `[FULL]`, grounded in `searcher.py::get_search_stats`).
    #[instrument(skip(self))]
    pub fn search_stats(&self) -> Result<SearchStats> {
        let rows = self.rt.block_on(self.store.all_search_rows())?;
        let total_count = self.rt.block_on(self.store.all_versions())?.len();

        let indexed_count = rows.len();
        let index_size_bytes = rows.iter().map(|r| r.content_text.len()).sum();

        let mut by_ext: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
        for row in &rows {
            let ext = Path::new(&row.file_path)
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            *by_ext.entry(ext).or_insert(0) += 1;
        }
        let mut file_types: Vec<(String, usize)> = by_ext.into_iter().collect();
        file_types.sort_by(|a, b| b.1.cmp(&a.1));
        file_types.truncate(10);

        Ok(SearchStats { indexed_count, total_count, index_size_bytes, file_types })
    }

    /// Verify that every digest referenced by a version or a tag has a
    /// corresponding, correctly-hashed object on disk (spec.md §4.2
    /// `[FULL]`).
    #[instrument(skip(self, progress))]
    pub fn integrity_check(&self, mut progress: Option<ProgressFn<'_>>) -> Result<IntegrityReport> {
        let versions = self.rt.block_on(self.store.all_versions())?;
        let tags = self.rt.block_on(self.store.list_tags())?;

        let mut digests: std::collections::BTreeSet<String> =
            versions.into_iter().map(|v| v.blob_digest).collect();
        digests.extend(tags.into_iter().map(|t| t.blob_digest));

        let total = digests.len();
        let mut corrupt = Vec::new();

        for (i, hex) in digests.into_iter().enumerate() {
            match hex.parse::<Digest>() {
                Ok(digest) => match self.cas.exists(&digest) {
                    Ok(true) => {
                        if let Ok(bytes) = self.cas.get(&digest) {
                            if Digest::compute(&bytes) != digest {
                                corrupt.push(CorruptRow {
                                    blob_digest: hex,
                                    reason: CorruptReason::HashMismatch,
                                });
                            }
                        }
                    }
                    _ => corrupt.push(CorruptRow { blob_digest: hex, reason: CorruptReason::MissingObject }),
                },
                Err(_) => corrupt.push(CorruptRow { blob_digest: hex, reason: CorruptReason::MissingObject }),
            }
            if let Some(cb) = progress.as_deref_mut() {
                cb(i + 1, total);
            }
        }

        Ok(IntegrityReport { checked: total, corrupt })
    }

    // -----------------------------------------------------------------
    // Ignore engine (shared with the watcher daemon)
    // -----------------------------------------------------------------

    pub fn should_ignore(&self, relative_path: &str) -> bool {
        self.ignore.lock().expect("ignore mutex poisoned").should_ignore(relative_path)
    }

    pub fn is_ignore_file(&self, path: &Path) -> bool {
        self.ignore.lock().expect("ignore mutex poisoned").is_ignore_file(path)
    }

    pub fn reload_ignore(&self) {
        self.ignore.lock().expect("ignore mutex poisoned").reload();
    }

    // -----------------------------------------------------------------
    // Daemon lifecycle
    // -----------------------------------------------------------------

    pub fn start_daemon(&self) -> Result<chronolog_core::supervisor::DaemonStatus> {
        let supervisor = chronolog_core::Supervisor::new(&self.meta_dir);
        Ok(supervisor.start(&daemon::watcher_argv(&self.root))?)
    }

    pub fn stop_daemon(&self) -> Result<chronolog_core::supervisor::DaemonStatus> {
        let supervisor = chronolog_core::Supervisor::new(&self.meta_dir);
        Ok(supervisor.stop()?)
    }

    pub fn daemon_status(&self) -> chronolog_core::supervisor::DaemonStatus {
        chronolog_core::Supervisor::new(&self.meta_dir).status()
    }
}

/// The repo-wide default branch name (spec.md §3).
pub const DEFAULT_BRANCH: &str = MAIN_BRANCH;

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_digest(bytes: &[u8]) -> String {
        Digest::compute(bytes).to_hex()
    }

    #[test]
    fn init_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = Repository::init(dir.path()).unwrap();
            assert_eq!(repo.root(), dir.path());
        }
        let repo = Repository::open(dir.path()).unwrap();
        let (current, branches) = repo.branch_overview().unwrap();
        assert_eq!(current, MAIN_BRANCH);
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let err = Repository::init(dir.path()).unwrap_err();
        assert!(matches!(err, ChronoLogError::RepositoryExists(_)));
    }

    #[test]
    fn record_and_log_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let content = b"hello\n";
        repo.record_file("greeting.txt", content, Some("first".into())).unwrap();

        let history = repo.log("greeting.txt").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].blob_digest, bytes_digest(content));
        assert_eq!(
            history[0].blob_digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn identical_content_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let content = b"same content\n";
        repo.record_file("a.txt", content, None).unwrap();
        let outcome = repo.record_file("a.txt", content, None).unwrap();
        assert!(matches!(outcome, RecordOutcome::Deduped(_)));
        assert_eq!(repo.log("a.txt").unwrap().len(), 1);
    }

    #[test]
    fn show_resolves_short_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let content = b"short prefix content\n";
        repo.record_file("b.txt", content, None).unwrap();
        let full = bytes_digest(content);
        let shown = repo.show(&full[..10]).unwrap();
        assert_eq!(shown, content);
    }

    #[test]
    fn branch_isolation_keeps_separate_heads() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("f.txt", b"on main\n", None).unwrap();
        repo.branch_create("feature", None).unwrap();
        repo.switch_branch("feature").unwrap();
        repo.record_file("f.txt", b"on feature\n", None).unwrap();

        let (_, branches) = repo.branch_overview().unwrap();
        let main = branches.iter().find(|b| b.name == MAIN_BRANCH).unwrap();
        let feature = branches.iter().find(|b| b.name == "feature").unwrap();
        assert_ne!(main.head_digest, feature.head_digest);
        assert_eq!(main.head_digest, bytes_digest(b"on main\n"));
        assert_eq!(feature.head_digest, bytes_digest(b"on feature\n"));
    }

    #[test]
    fn cannot_delete_main_or_current_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(repo.delete_branch(MAIN_BRANCH).is_err());
        repo.branch_create("wip", None).unwrap();
        repo.switch_branch("wip").unwrap();
        assert!(repo.delete_branch("wip").is_err());
    }

    #[test]
    fn checkout_brackets_with_two_revisions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("c.txt", b"version one\n", None).unwrap();
        let v1 = bytes_digest(b"version one\n");
        std::fs::write(dir.path().join("c.txt"), b"version two\n").unwrap();
        repo.record_file("c.txt", b"version two\n", None).unwrap();

        repo.checkout(&v1, "c.txt").unwrap();

        let history = repo.log("c.txt").unwrap();
        assert_eq!(history.len(), 4);
        let on_disk = std::fs::read(dir.path().join("c.txt")).unwrap();
        assert_eq!(on_disk, b"version one\n");

        let restored = &history[0];
        assert_eq!(restored.parent_digest.as_deref(), Some(v1.as_str()));
        let backup = &history[1];
        assert!(backup.parent_digest.is_none());
    }

    #[test]
    fn diff_requires_b_or_current() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("d.txt", b"only version\n", None).unwrap();
        let digest = bytes_digest(b"only version\n");
        let err = repo.diff(&digest, None, false, DiffKind::Line).unwrap_err();
        assert!(matches!(err, ChronoLogError::InvalidArgument(_)));
    }

    #[test]
    fn diff_against_current_reads_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("e.txt", b"line one\n", None).unwrap();
        std::fs::write(dir.path().join("e.txt"), b"line one\nline two\n").unwrap();
        let digest = bytes_digest(b"line one\n");

        let report = repo.diff(&digest, None, true, DiffKind::Line).unwrap();
        assert_eq!(report.file_path, "e.txt");
        assert!(report.digest_b.is_none());
        assert!(matches!(report.output, DiffOutput::Line { .. }));
    }

    #[test]
    fn tag_without_digest_uses_latest_revision() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("f.txt", b"older\n", None).unwrap();
        repo.record_file("g.txt", b"newer\n", None).unwrap();

        let tag = repo.tag_create("release", None, Some("first cut".into())).unwrap();
        assert_eq!(tag.blob_digest, bytes_digest(b"newer\n"));
    }

    #[test]
    fn reindex_skips_binary_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("text.txt", b"plain text\n", None).unwrap();
        repo.record_file("bin.dat", b"\x00\x01\x02binary", None).unwrap();

        let (indexed, total) = repo.reindex(None).unwrap();
        assert_eq!(total, 2);
        assert_eq!(indexed, 1);

        let stats = repo.search_stats().unwrap();
        assert_eq!(stats.indexed_count, 1);
        assert_eq!(stats.total_count, 2);
    }

    #[test]
    fn integrity_check_reports_no_corruption_on_healthy_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("h.txt", b"healthy\n", None).unwrap();
        let report = repo.integrity_check(None).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn merge_resolves_revisions_by_digest() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("m.txt", b"A\nB\nC\n", None).unwrap();
        repo.record_file("m.txt", b"A\nB2\nC\n", None).unwrap();
        // Re-record the base content under a second path so its digest is
        // independently resolvable (branch heads track only the latest).
        repo.record_file("m_theirs.txt", b"A\nB\nC2\n", None).unwrap();

        let base = bytes_digest(b"A\nB\nC\n");
        let ours = bytes_digest(b"A\nB2\nC\n");
        let theirs = bytes_digest(b"A\nB\nC2\n");

        let result = repo.merge(&base, &ours, &theirs, Some("m.txt")).unwrap();
        assert!(result.success);
        assert_eq!(result.content.unwrap(), b"A\nB2\nC2\n".to_vec());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn integrity_check_detects_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.record_file("i.txt", b"will be deleted\n", None).unwrap();
        let digest = bytes_digest(b"will be deleted\n");
        let shard = &digest[..2];
        let rest = &digest[2..];
        std::fs::remove_file(repo.meta_dir().join("objects").join(shard).join(rest)).unwrap();

        let report = repo.integrity_check(None).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.corrupt[0].reason, CorruptReason::MissingObject);
    }
}
