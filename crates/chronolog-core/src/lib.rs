//! chronolog-core: the object store (C1), ignore engine (C3), diff engines
//! (C5), and daemon supervisor (C8) described in spec.md §4.1, §4.3, §4.5,
//! §4.8.
//!
//! Everything in this crate is synchronous and free of domain knowledge
//! about versions, branches, or tags — those live in `chronolog-store`
//! (the metadata façade) and are tied together by `chronolog-repo`.

pub mod cas;
pub mod diff;
pub mod ignore;
pub mod supervisor;
pub mod telemetry;

pub use cas::fs::FsCasStore;
pub use cas::{CasError, CasStore, Digest};
pub use diff::{diff as run_diff, DiffKind, DiffOutput};
pub use ignore::IgnoreEngine;
pub use supervisor::{DaemonStatus, Supervisor};
pub use telemetry::{init_daemon_tracing, init_tracing};

/// ChronoLog version, shared across every binary in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
