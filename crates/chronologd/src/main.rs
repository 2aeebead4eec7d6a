//! `chronologd`: the watcher daemon spawned by `chronolog daemon start`
//! (spec.md §4.7, §4.8). Takes a single argument, the repository root, and
//! blocks running the debounced filesystem watcher until it receives
//! SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, Level};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ChronoLog] {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let repo_root = std::env::args()
        .nth(1)
        .context("usage: chronologd <repository-root>")?;

    let repo = chronolog_repo::Repository::open(&repo_root)
        .with_context(|| format!("opening repository at {repo_root}"))?;

    // Logs go to <repo>/.chronolog/daemon.log, never stdout/stderr: the
    // supervisor detaches this process and nothing is left to read them.
    let _guard = chronolog_core::init_daemon_tracing(repo.meta_dir(), Level::INFO);
    info!(root = %repo.root().display(), "chronologd starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("installing signal handler")?;

    if let Err(e) = chronolog_watch::run(&repo, &shutdown) {
        error!(error = %e, "watcher exited with an error");
        return Err(anyhow::Error::new(e));
    }

    info!("chronologd stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn main_compiles_and_returns_exit_code() {
        let _: fn() -> std::process::ExitCode = super::main;
    }
}
