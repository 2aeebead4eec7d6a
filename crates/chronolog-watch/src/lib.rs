//! chronolog-watch: the debounced filesystem watcher daemon logic (spec.md
//! §4.7, C7), grounded in `watcher/watcher.py`'s `DebouncedFileHandler`.
//!
//! Recursively watches a repository root with `notify`, and rather than
//! committing on every raw filesystem event (an editor can fire a dozen
//! writes for one keystroke), tracks a per-path "last touched" timestamp
//! and sweeps it on a timer: any path untouched for `debounce` keeps
//! waiting, any path idle past it gets committed. The sweep interval and
//! debounce window are overridable via `CHRONOLOG_SWEEP_MS` and
//! `CHRONOLOG_DEBOUNCE_MS` so integration tests don't have to wait out the
//! real-world defaults.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use thiserror::Error;
use tracing::{debug, info, warn};

use chronolog_repo::{Repository, META_DIR_NAME};

pub const DEFAULT_SWEEP_MS: u64 = 100;
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const SWEEP_ENV_VAR: &str = "CHRONOLOG_SWEEP_MS";
pub const DEBOUNCE_ENV_VAR: &str = "CHRONOLOG_DEBOUNCE_MS";

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("filesystem watch error: {0}")]
    Notify(#[from] notify::Error),
}

type Result<T> = std::result::Result<T, WatchError>;

fn duration_from_env(var: &str, default_ms: u64) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_ms))
}

/// Watch `repo`'s root recursively and auto-commit debounced changes until
/// `shutdown` is set (spec.md §4.7, §4.8 — the watcher is what `chronologd`
/// runs; SIGTERM/SIGINT handling lives in the binary, not here).
pub fn run(repo: &Repository, shutdown: &AtomicBool) -> Result<()> {
    let sweep = duration_from_env(SWEEP_ENV_VAR, DEFAULT_SWEEP_MS);
    let debounce = duration_from_env(DEBOUNCE_ENV_VAR, DEFAULT_DEBOUNCE_MS);
    let pending: Mutex<HashMap<String, Instant>> = Mutex::new(HashMap::new());

    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    watcher.watch(repo.root(), RecursiveMode::Recursive)?;

    info!(root = %repo.root().display(), ?sweep, ?debounce, "watcher started");

    std::thread::scope(|scope| {
        scope.spawn(|| sweeper_loop(repo, &pending, sweep, debounce, shutdown));

        while !shutdown.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(Ok(event)) => handle_event(repo, &pending, &event),
                Ok(Err(e)) => warn!(error = %e, "watch event error"),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    info!("watcher stopped");
    Ok(())
}

fn sweeper_loop(
    repo: &Repository,
    pending: &Mutex<HashMap<String, Instant>>,
    sweep: Duration,
    debounce: Duration,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(sweep);
        let ready = {
            let mut guard = pending.lock().expect("pending mutex poisoned");
            select_ready(&mut guard, debounce)
        };
        for rel in ready {
            commit_path(repo, &rel);
        }
    }
}

/// Pop every path whose last-touched instant is at least `debounce` old.
/// Pure and deterministic given fixed `Instant`s — kept separate from
/// `sweeper_loop` so debounce behavior is unit-testable without real time.
fn select_ready(pending: &mut HashMap<String, Instant>, debounce: Duration) -> Vec<String> {
    let now = Instant::now();
    let ready: Vec<String> = pending
        .iter()
        .filter(|(_, touched)| now.duration_since(**touched) >= debounce)
        .map(|(path, _)| path.clone())
        .collect();
    for path in &ready {
        pending.remove(path);
    }
    ready
}

fn handle_event(repo: &Repository, pending: &Mutex<HashMap<String, Instant>>, event: &Event) {
    if matches!(event.kind, EventKind::Remove(_)) {
        return;
    }
    for path in &event.paths {
        track_path(repo, pending, path);
    }
}

/// Decide whether `path` (absolute) should be queued for a debounced
/// commit: skips anything outside the repo, inside `.chronolog/`, or
/// matching the ignore engine; reloads the ignore engine immediately
/// (un-debounced) when the touched file is the ignore file itself
/// (spec.md §4.3, §4.7).
fn track_path(repo: &Repository, pending: &Mutex<HashMap<String, Instant>>, path: &Path) {
    if !path.is_file() {
        return;
    }
    let Ok(rel) = repo.relative(path) else {
        return;
    };
    if rel.starts_with(&format!("{META_DIR_NAME}/")) {
        return;
    }
    if repo.is_ignore_file(path) {
        debug!("ignore file changed, reloading patterns");
        repo.reload_ignore();
    }
    if repo.should_ignore(&rel) {
        return;
    }
    // Sniff the first 1 KiB for a NUL byte and drop binary files rather than
    // queue them (spec.md §4.7 step 3: re-sniffed per event, never cached —
    // see SPEC_FULL.md §9's Open Question decision).
    let Ok(bytes) = std::fs::read(path) else {
        return;
    };
    if chronolog_core::ignore::looks_binary(&bytes) {
        debug!(path = %rel, "dropping binary file from watch queue");
        return;
    }
    pending.lock().expect("pending mutex poisoned").insert(rel, Instant::now());
}

fn commit_path(repo: &Repository, rel: &str) {
    let abs = repo.root().join(rel);
    let bytes = match std::fs::read(&abs) {
        Ok(b) => b,
        Err(e) => {
            debug!(path = rel, error = %e, "skipping commit, file unreadable");
            return;
        }
    };
    match repo.record_file(rel, &bytes, Some("Auto-saved".to_string())) {
        Ok(_) => info!(path = rel, "auto-committed"),
        Err(e) => warn!(path = rel, error = %e, "auto-commit failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_ready_only_returns_entries_past_debounce() {
        let mut pending = HashMap::new();
        pending.insert("old.txt".to_string(), Instant::now() - Duration::from_millis(600));
        pending.insert("fresh.txt".to_string(), Instant::now());

        let ready = select_ready(&mut pending, Duration::from_millis(500));
        assert_eq!(ready, vec!["old.txt".to_string()]);
        assert!(pending.contains_key("fresh.txt"));
        assert!(!pending.contains_key("old.txt"));
    }

    #[test]
    fn select_ready_drains_matched_entries() {
        let mut pending = HashMap::new();
        pending.insert("a.txt".to_string(), Instant::now() - Duration::from_secs(1));
        let first = select_ready(&mut pending, Duration::from_millis(100));
        assert_eq!(first.len(), 1);
        let second = select_ready(&mut pending, Duration::from_millis(100));
        assert!(second.is_empty());
    }

    #[test]
    fn track_path_skips_meta_directory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let pending = Mutex::new(HashMap::new());
        let meta_file = repo.meta_dir().join("db").join("something.db");
        std::fs::create_dir_all(meta_file.parent().unwrap()).unwrap();
        std::fs::write(&meta_file, b"x").unwrap();

        track_path(&repo, &pending, &meta_file);
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn track_path_skips_ignored_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        let artifact = target.join("build.o");
        std::fs::write(&artifact, b"binary").unwrap();

        let pending = Mutex::new(HashMap::new());
        track_path(&repo, &pending, &artifact);
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn track_path_queues_ordinary_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hello").unwrap();

        let pending = Mutex::new(HashMap::new());
        track_path(&repo, &pending, &file);
        assert!(pending.lock().unwrap().contains_key("notes.txt"));
    }

    #[test]
    fn track_path_drops_files_that_sniff_as_binary() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let file = dir.path().join("blob.dat");
        std::fs::write(&file, b"\x00\x01\x02payload").unwrap();

        let pending = Mutex::new(HashMap::new());
        track_path(&repo, &pending, &file);
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn track_path_reloads_ignore_engine_on_ignore_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let ignore_file = dir.path().join(".chronologignore");
        let mut contents = std::fs::read_to_string(&ignore_file).unwrap();
        contents.push_str("\ncustom_secret.txt\n");
        std::fs::write(&ignore_file, contents).unwrap();

        let pending = Mutex::new(HashMap::new());
        track_path(&repo, &pending, &ignore_file);

        assert!(repo.should_ignore("custom_secret.txt"));
    }

    #[test]
    fn commit_path_records_a_revision() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("saved.txt"), b"content\n").unwrap();

        commit_path(&repo, "saved.txt");

        let history = repo.log("saved.txt").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].annotation.as_deref(), Some("Auto-saved"));
    }
}
