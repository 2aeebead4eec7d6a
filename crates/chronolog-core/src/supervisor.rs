//! Cross-platform daemon lifecycle (spec.md §4.8, C8).
//!
//! This module knows nothing about ChronoLog's domain — it only spawns a
//! detached child process, writes/reads a PID file, and checks whether a
//! PID is both alive and still identifiable as the process that wrote the
//! file (robust to PID reuse, per spec.md §4.8). The caller supplies the
//! argv for the watcher entry point; `chronolog-repo`'s `init` and
//! `chronolog-cli`'s `daemon` subcommand both drive this module.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use sysinfo::{Pid, System};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn daemon process: {0}")]
    Spawn(#[from] io::Error),

    #[error("pid file contained invalid data: {0}")]
    InvalidPidFile(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Result of [`Supervisor::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonStatus {
    pub running: bool,
    pub pid: Option<u32>,
}

/// A substring expected in the running process's command line that marks
/// it as "the chronolog watcher", used to distinguish a live-but-reused
/// PID from an actual chronolog daemon (spec.md §4.8: "Liveness test must
/// be robust to PID reuse: verify the executable/command line, not just
/// existence").
const IDENTIFYING_ARG: &str = "chronologd";

/// Owns the PID-file-based lifecycle of one repository's watcher daemon.
pub struct Supervisor {
    pid_file: PathBuf,
    log_file: PathBuf,
}

impl Supervisor {
    /// `meta_dir` is conventionally `<repo>/.chronolog`.
    pub fn new(meta_dir: impl AsRef<Path>) -> Self {
        let meta_dir = meta_dir.as_ref();
        Self {
            pid_file: meta_dir.join("daemon.pid"),
            log_file: meta_dir.join("daemon.log"),
        }
    }

    /// Spawn `argv[0]` with `argv[1..]`, detached from the controlling
    /// terminal, with stdio redirected to `daemon.log`. No-op if a live,
    /// identifiable daemon is already running (spec.md §4.8 `start`).
    #[instrument(skip(self, argv))]
    pub fn start(&self, argv: &[String]) -> Result<DaemonStatus> {
        if let Some(pid) = self.read_live_pid() {
            info!(pid, "daemon already running, start is a no-op");
            return Ok(DaemonStatus {
                running: true,
                pid: Some(pid),
            });
        }

        let Some((program, args)) = argv.split_first() else {
            return Err(SupervisorError::Spawn(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty argv for daemon spawn",
            )));
        };

        let log = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        detach(&mut cmd);

        let child = cmd.spawn()?;
        let pid = child.id();
        // Deliberately do not wait() — the child is meant to outlive us.
        std::mem::forget(child);

        fs::write(&self.pid_file, pid.to_string())?;
        info!(pid, "daemon spawned");
        Ok(DaemonStatus {
            running: true,
            pid: Some(pid),
        })
    }

    /// Send a graceful termination signal to the running daemon and
    /// remove the PID file. A stale PID file (dead process, or a live
    /// process that isn't identifiable as chronologd) is treated as
    /// "not running" rather than an error (spec.md §4.8 `[FULL]`).
    #[instrument(skip(self))]
    pub fn stop(&self) -> Result<DaemonStatus> {
        let Some(pid) = self.read_live_pid() else {
            let _ = fs::remove_file(&self.pid_file);
            return Ok(DaemonStatus {
                running: false,
                pid: None,
            });
        };

        terminate(pid);
        let _ = fs::remove_file(&self.pid_file);
        info!(pid, "daemon stopped");
        Ok(DaemonStatus {
            running: false,
            pid: Some(pid),
        })
    }

    /// `{running, pid}` where `running` requires both liveness and
    /// command-line identity (spec.md §4.8 `status`).
    pub fn status(&self) -> DaemonStatus {
        match self.read_live_pid() {
            Some(pid) => DaemonStatus {
                running: true,
                pid: Some(pid),
            },
            None => DaemonStatus {
                running: false,
                pid: None,
            },
        }
    }

    /// Read the PID file, if any, and return its PID only if that process
    /// is alive AND its command line identifies it as the chronolog
    /// watcher.
    fn read_live_pid(&self) -> Option<u32> {
        let raw = fs::read_to_string(&self.pid_file).ok()?;
        let pid: u32 = raw.trim().parse().ok()?;
        if is_alive_and_mine(pid) {
            Some(pid)
        } else {
            debug!(pid, "pid file present but process is stale");
            None
        }
    }
}

/// Is `pid` alive, and does its command line identify it as a chronolog
/// watcher? Robust to PID reuse (spec.md §4.8).
pub fn is_alive_and_mine(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = Pid::from_u32(pid);
    if !sys.refresh_process(sys_pid) {
        return false;
    }
    match sys.process(sys_pid) {
        Some(process) => {
            let name_matches = process.name().to_string_lossy().contains(IDENTIFYING_ARG);
            let cmdline_matches = process
                .cmd()
                .iter()
                .any(|arg| arg.to_string_lossy().contains(IDENTIFYING_ARG));
            name_matches || cmdline_matches
        }
        None => false,
    }
}

/// Send SIGTERM (POSIX) / a graceful stop request (Windows) to `pid`.
pub fn terminate(pid: u32) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status();
    }
    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .status();
    }
}

/// Detach `cmd` from the current process group / console so it survives
/// the parent exiting (new session on POSIX; no-window flag on Windows).
fn detach(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Starting a new session (setsid-equivalent) detaches from the
        // controlling terminal; group 0 means "become the leader".
        cmd.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        cmd.creation_flags(CREATE_NO_WINDOW | DETACHED_PROCESS);
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = cmd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_no_pid_file_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Supervisor::new(dir.path());
        let status = sup.status();
        assert!(!status.running);
        assert_eq!(status.pid, None);
    }

    #[test]
    fn stop_with_no_pid_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Supervisor::new(dir.path());
        let status = sup.stop().unwrap();
        assert!(!status.running);
    }

    #[test]
    fn stale_pid_file_is_treated_as_not_running() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("daemon.pid"), "999999999").unwrap();
        let sup = Supervisor::new(dir.path());
        let status = sup.status();
        assert!(!status.running);
    }

    #[test]
    fn is_alive_and_mine_false_for_bogus_pid() {
        assert!(!is_alive_and_mine(u32::MAX));
    }
}
