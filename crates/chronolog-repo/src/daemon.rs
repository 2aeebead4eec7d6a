//! Builds the argv used to spawn `chronologd` against a repository, and
//! re-exports daemon lifecycle operations through [`crate::Repository`]
//! (spec.md §4.8, C8). The actual process-management logic lives in
//! `chronolog_core::supervisor`; this module only knows how to find the
//! `chronologd` binary next to whichever binary is currently running.

use std::path::{Path, PathBuf};

/// Locate the `chronologd` binary: first next to the current executable
/// (the common case — both ship in the same `target/` directory), falling
/// back to bare `chronologd` resolved via `PATH`.
fn chronologd_path() -> PathBuf {
    let exe_name = if cfg!(windows) { "chronologd.exe" } else { "chronologd" };
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join(exe_name)))
        .filter(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(exe_name))
}

/// Build the argv for spawning the watcher daemon against `repo_root`.
pub fn watcher_argv(repo_root: &Path) -> Vec<String> {
    vec![
        chronologd_path().to_string_lossy().to_string(),
        repo_root.to_string_lossy().to_string(),
    ]
}
