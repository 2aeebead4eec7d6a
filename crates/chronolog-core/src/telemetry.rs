//! Centralised tracing initialisation for ChronoLog binaries.
//!
//! Call [`init_tracing`] once at program start for the CLI, which logs to
//! stderr so redirected stdout stays clean for piping `show`/`diff`
//! output. Call [`init_daemon_tracing`] once from `chronologd`, which
//! logs to `daemon.log` through a non-blocking appender since the
//! daemon's own stdio is already redirected there by the supervisor.
//!
//! Safe to call more than once — subsequent calls are silently ignored
//! (the global subscriber can only be set once per process).

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber for a foreground binary,
/// writing to stderr.
///
/// Respects `RUST_LOG` for fine-grained filtering; falls back to `level`
/// when unset.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

/// Initialise the global tracing subscriber for `chronologd`, writing to
/// `<log_dir>/daemon.log` through a non-blocking appender.
///
/// Returns the [`WorkerGuard`]; the caller must keep it alive for the
/// process lifetime or buffered log lines may be dropped on exit.
pub fn init_daemon_tracing(log_dir: &Path, level: Level) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let file_appender = tracing_appender::rolling::never(log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(non_blocking))
        .try_init()
        .ok();

    guard
}
