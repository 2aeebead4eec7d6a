//! `chronolog`: the command-line interface for a ChronoLog repository
//! (spec.md §6). A thin synchronous binary over `chronolog-repo::Repository`
//! — there is no async anywhere in this crate graph, so unlike the
//! watcher daemon's entry point this is just `fn main`, not a runtime.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use chronolog_core::diff::{BinaryDiffReport, LineDiffLine, SemanticChangeKind, WordOp};
use chronolog_merge::{ConflictResolution, MergeResult};
use chronolog_repo::{DiffKind, DiffOutput, Repository};
use chronolog_store::{AdvancedSearchFilter, ChangeKind};

#[derive(Parser)]
#[command(name = "chronolog")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Frictionless local version control with full-text history search", long_about = None)]
struct Cli {
    /// Enable debug-level logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository in a directory
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the recorded history of a file, newest first
    Log {
        file: PathBuf,
    },

    /// Print the bytes recorded under a digest (a unique prefix is enough)
    Show {
        digest: String,
    },

    /// Diff one revision against another, or against the working copy
    Diff {
        a: String,
        b: Option<String>,

        /// Diff `a` against the file's current on-disk content
        #[arg(long, conflicts_with = "b")]
        current: bool,

        #[arg(long = "type", value_enum, default_value = "line")]
        kind: DiffTypeArg,
    },

    /// Restore a file to a previously recorded revision
    Checkout {
        digest: String,
        file: PathBuf,
    },

    /// Tag management
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Branch management
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Search recorded revision content
    Search {
        query: String,

        /// Restrict to a single file path
        #[arg(long)]
        file: Option<String>,

        /// Restrict to one or more file extensions (repeatable)
        #[arg(long = "type")]
        file_types: Vec<String>,

        /// Treat the query as a regular expression
        #[arg(long)]
        regex: bool,

        /// Match case exactly (default: case-insensitive)
        #[arg(long)]
        case_sensitive: bool,

        /// Match on word boundaries only
        #[arg(long)]
        whole_words: bool,

        /// Restrict to revisions recorded within the last N days
        #[arg(long)]
        recent: Option<i64>,

        /// Cap the number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Find revisions where this text was newly introduced
        #[arg(long, conflicts_with_all = ["removed", "file", "regex", "case_sensitive", "whole_words", "recent", "limit"])]
        added: Option<String>,

        /// Find revisions where this text disappeared
        #[arg(long, conflicts_with_all = ["added", "file", "regex", "case_sensitive", "whole_words", "recent", "limit"])]
        removed: Option<String>,
    },

    /// Rebuild the full-text search index from every recorded blob
    Reindex,

    /// Ignore file management
    Ignore {
        #[command(subcommand)]
        action: IgnoreAction,
    },

    /// Watcher daemon control
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },

    /// Three-way merge of three previously recorded revisions
    Merge {
        base: String,
        ours: String,
        theirs: String,

        /// File path to attribute the merge to (metadata only)
        #[arg(long)]
        path: Option<String>,

        /// Resolve remaining conflict regions instead of leaving markers
        #[arg(long, value_enum)]
        resolve: Option<ResolveArg>,
    },
}

#[derive(Subcommand)]
enum TagAction {
    /// Create a tag, defaulting to the most recently recorded revision
    Create {
        name: String,
        digest: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List every tag
    List,
    /// Delete a tag
    Delete {
        name: String,
    },
}

#[derive(Subcommand)]
enum BranchAction {
    /// Create a branch, defaulting to branching from the current branch
    Create {
        name: String,
        #[arg(long)]
        from: Option<String>,
    },
    /// List every branch, marking the current one
    List,
    /// Switch the active branch
    Switch {
        name: String,
    },
    /// Delete a branch
    Delete {
        name: String,
    },
}

#[derive(Subcommand)]
enum IgnoreAction {
    /// Print the effective ignore patterns
    Show,
    /// Write a default `.chronologignore` file
    Init,
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the watcher daemon if it isn't already running
    Start,
    /// Stop the watcher daemon
    Stop,
    /// Report whether the watcher daemon is running
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiffTypeArg {
    Line,
    Word,
    Semantic,
    Binary,
}

/// How to settle conflict regions a merge couldn't resolve on its own.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolveArg {
    /// Apply every rule `chronolog-merge` can decide automatically, leaving
    /// any region it can't to be edited by hand.
    Auto,
    /// Take our side wholesale for every remaining conflict region.
    Ours,
    /// Take their side wholesale for every remaining conflict region.
    Theirs,
}

impl From<DiffTypeArg> for DiffKind {
    fn from(arg: DiffTypeArg) -> Self {
        match arg {
            DiffTypeArg::Line => DiffKind::Line,
            DiffTypeArg::Word => DiffKind::Word,
            DiffTypeArg::Semantic => DiffKind::Semantic,
            DiffTypeArg::Binary => DiffKind::Binary,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    chronolog_core::init_tracing(cli.json, level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ChronoLog] {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Log { file } => cmd_log(file, cli.json),
        Commands::Show { digest } => cmd_show(digest),
        Commands::Diff { a, b, current, kind } => cmd_diff(a, b.as_deref(), *current, (*kind).into()),
        Commands::Checkout { digest, file } => cmd_checkout(digest, file),
        Commands::Tag { action } => cmd_tag(action, cli.json),
        Commands::Branch { action } => cmd_branch(action, cli.json),
        Commands::Search {
            query,
            file,
            file_types,
            regex,
            case_sensitive,
            whole_words,
            recent,
            limit,
            added,
            removed,
        } => cmd_search(
            query,
            file.as_deref(),
            file_types,
            *regex,
            *case_sensitive,
            *whole_words,
            *recent,
            *limit,
            added.as_deref(),
            removed.as_deref(),
            cli.json,
        ),
        Commands::Reindex => cmd_reindex(),
        Commands::Ignore { action } => cmd_ignore(action),
        Commands::Daemon { action } => cmd_daemon(action, cli.json),
        Commands::Merge { base, ours, theirs, path, resolve } => {
            cmd_merge(base, ours, theirs, path.as_deref(), *resolve, cli.json)
        }
    }
}

fn open_repo() -> Result<Repository> {
    Repository::discover(".").context("no chronolog repository found in this directory or its ancestors")
}

// -----------------------------------------------------------------------
// init / log / show / diff / checkout
// -----------------------------------------------------------------------

fn cmd_init(path: &std::path::Path) -> Result<()> {
    let repo = Repository::init(path).with_context(|| format!("initializing {}", path.display()))?;
    println!("Initialized empty ChronoLog repository in {}", repo.meta_dir().display());
    Ok(())
}

fn cmd_log(file: &std::path::Path, json: bool) -> Result<()> {
    let repo = open_repo()?;
    let mut history = repo.log(file).context("reading file history")?;
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("No revisions recorded for {}", file.display());
        return Ok(());
    }
    for row in &history {
        let annotation = row.annotation.as_deref().unwrap_or("");
        println!(
            "{}  {:>8}  {} bytes  {}",
            &row.blob_digest[..8],
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.byte_size,
            annotation,
        );
    }
    Ok(())
}

fn cmd_show(digest: &str) -> Result<()> {
    let repo = open_repo()?;
    let bytes = repo.show(digest).context("reading revision")?;
    use std::io::Write;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}

fn cmd_diff(a: &str, b: Option<&str>, current: bool, kind: DiffKind) -> Result<()> {
    let repo = open_repo()?;
    let report = repo.diff(a, b, current, kind).context("computing diff")?;
    render_diff(&report.output);
    Ok(())
}

fn render_diff(output: &DiffOutput) {
    match output {
        DiffOutput::Line { header_a, header_b, lines } => {
            println!("--- {header_a}");
            println!("+++ {header_b}");
            for line in lines {
                match line {
                    LineDiffLine::HunkHeader(s) => println!("{s}"),
                    LineDiffLine::Context(s) => println!(" {s}"),
                    LineDiffLine::Addition(s) => println!("+{s}"),
                    LineDiffLine::Deletion(s) => println!("-{s}"),
                }
            }
        }
        DiffOutput::Word { ops } => {
            for op in ops {
                match op {
                    WordOp::Equal(s) => print!("{s}"),
                    WordOp::Insert(s) => print!("[+{s}+]"),
                    WordOp::Delete(s) => print!("[-{s}-]"),
                }
            }
            println!();
        }
        DiffOutput::Semantic { changes } => {
            if changes.is_empty() {
                println!("No semantic changes detected.");
            }
            for change in changes {
                let name = change
                    .new
                    .as_ref()
                    .or(change.old.as_ref())
                    .map(|e| e.name.as_str())
                    .unwrap_or("?");
                match change.kind {
                    SemanticChangeKind::Added => println!("+ {} {name}", change.element_kind),
                    SemanticChangeKind::Removed => println!("- {} {name}", change.element_kind),
                    SemanticChangeKind::Modified => println!("~ {} {name}", change.element_kind),
                    SemanticChangeKind::Renamed => {
                        let old_name = change.old.as_ref().map(|e| e.name.as_str()).unwrap_or("?");
                        println!("~ {} {old_name} -> {name} (renamed)", change.element_kind)
                    }
                }
            }
        }
        DiffOutput::Binary(report) => render_binary_diff(report),
    }
}

fn render_binary_diff(report: &BinaryDiffReport) {
    if report.identical {
        println!("Binary files are identical.");
        return;
    }
    println!(
        "Binary diff: {} bytes -> {} bytes (similarity {:.1}%)",
        report.old_len,
        report.new_len,
        report.similarity * 100.0
    );
    println!("old sha256 {}", report.old_sha256);
    println!("new sha256 {}", report.new_sha256);
    for chunk in &report.chunks {
        println!("  offset {:#x}: {} -> {}", chunk.offset, chunk.old_hex, chunk.new_hex);
    }
    if report.chunks_truncated {
        println!("  ... chunk list truncated");
    }
}

fn cmd_checkout(digest: &str, file: &std::path::Path) -> Result<()> {
    let repo = open_repo()?;
    repo.checkout(digest, file).context("checking out revision")?;
    println!("Checked out {} to {}", digest, file.display());
    Ok(())
}

fn cmd_merge(
    base: &str,
    ours: &str,
    theirs: &str,
    path: Option<&str>,
    resolve: Option<ResolveArg>,
    json: bool,
) -> Result<()> {
    let repo = open_repo()?;
    let mut result = repo.merge(base, ours, theirs, path).context("merging revisions")?;

    if !result.success {
        if let (Some(resolve), Some(content)) = (resolve, result.content.as_ref()) {
            let text = std::str::from_utf8(content).context("resolving a binary merge conflict")?;
            let (resolved, unresolved) = match resolve {
                ResolveArg::Auto => chronolog_merge::auto_resolve_content(text),
                ResolveArg::Ours => (chronolog_merge::resolve_conflict(text, &ConflictResolution::Ours), 0),
                ResolveArg::Theirs => (chronolog_merge::resolve_conflict(text, &ConflictResolution::Theirs), 0),
            };
            result.content = Some(resolved.into_bytes());
            result.success = unresolved == 0;
            if result.success {
                result.conflicts.clear();
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_merge_result(&result);
    if !result.success {
        anyhow::bail!("{} conflict region(s) remain unresolved", result.conflicts.len());
    }
    Ok(())
}

fn print_merge_result(result: &MergeResult) {
    if let Some(content) = &result.content {
        use std::io::Write;
        let _ = std::io::stdout().write_all(content);
        println!();
    }
}

// -----------------------------------------------------------------------
// tag / branch
// -----------------------------------------------------------------------

fn cmd_tag(action: &TagAction, json: bool) -> Result<()> {
    let repo = open_repo()?;
    match action {
        TagAction::Create { name, digest, description } => {
            let tag = repo
                .tag_create(name, digest.as_deref(), description.clone())
                .context("creating tag")?;
            println!("Created tag {} -> {}", tag.name, &tag.blob_digest[..8]);
        }
        TagAction::List => {
            let mut tags = repo.tag_list().context("listing tags")?;
            tags.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
                return Ok(());
            }
            for tag in &tags {
                let desc = tag.description.as_deref().unwrap_or("");
                println!("{}  {}  {desc}", tag.name, &tag.blob_digest[..8]);
            }
        }
        TagAction::Delete { name } => {
            repo.tag_delete(name).context("deleting tag")?;
            println!("Deleted tag {name}");
        }
    }
    Ok(())
}

fn cmd_branch(action: &BranchAction, json: bool) -> Result<()> {
    let repo = open_repo()?;
    match action {
        BranchAction::Create { name, from } => {
            let branch = repo.branch_create(name, from.as_deref()).context("creating branch")?;
            println!("Created branch {} from head {}", branch.name, short_digest(&branch.head_digest));
        }
        BranchAction::List => {
            let (current, branches) = repo.branch_overview().context("listing branches")?;
            if json {
                let payload = serde_json::json!({"current": current, "branches": branches});
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }
            for branch in &branches {
                let marker = if branch.name == current { "*" } else { " " };
                println!("{marker} {}  {}", branch.name, short_digest(&branch.head_digest));
            }
        }
        BranchAction::Switch { name } => {
            repo.switch_branch(name).context("switching branch")?;
            println!("Switched to branch {name}");
        }
        BranchAction::Delete { name } => {
            repo.delete_branch(name).context("deleting branch")?;
            println!("Deleted branch {name}");
        }
    }
    Ok(())
}

fn short_digest(digest: &str) -> &str {
    if digest.is_empty() {
        "(empty)"
    } else {
        &digest[..digest.len().min(8)]
    }
}

// -----------------------------------------------------------------------
// search / reindex
// -----------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_search(
    query: &str,
    file: Option<&str>,
    file_types: &[String],
    regex: bool,
    case_sensitive: bool,
    whole_words: bool,
    recent: Option<i64>,
    limit: Option<usize>,
    added: Option<&str>,
    removed: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repo()?;

    if added.is_some() || removed.is_some() {
        let results = repo.search_changes(added, removed).context("searching changes")?;
        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }
        for r in &results {
            let verb = match r.kind {
                ChangeKind::Added => "added",
                ChangeKind::Removed => "removed",
            };
            println!(
                "{}  {verb} {:?}  {} -> {}",
                r.file_path,
                r.needle,
                short_digest(&r.older_digest),
                short_digest(&r.newer_digest),
            );
        }
        return Ok(());
    }

    let plain = file_types.is_empty() && !regex && !case_sensitive && !whole_words && recent.is_none() && limit.is_none();
    let results = if plain {
        repo.search(query, file).context("searching")?
    } else {
        let filter = AdvancedSearchFilter {
            query: query.to_string(),
            regex,
            case_sensitive,
            whole_words,
            file_paths: file.map(|f| vec![f.to_string()]).unwrap_or_default(),
            file_types: file_types.to_vec(),
            date_from: recent.map(|days| Utc::now() - Duration::days(days)),
            date_to: None,
            limit,
        };
        repo.advanced_search(&filter).context("searching")?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for r in &results {
        println!("{}  {}  {}", r.file_path, &r.blob_digest[..8], r.snippet);
    }
    Ok(())
}

fn cmd_reindex() -> Result<()> {
    let repo = open_repo()?;
    let (indexed, total) = repo.reindex(None).context("reindexing")?;
    println!("Indexed {indexed} of {total} revisions.");
    Ok(())
}

// -----------------------------------------------------------------------
// ignore / daemon
// -----------------------------------------------------------------------

fn cmd_ignore(action: &IgnoreAction) -> Result<()> {
    match action {
        IgnoreAction::Show => {
            let repo = open_repo()?;
            let path = repo.root().join(".chronologignore");
            match std::fs::read_to_string(&path) {
                Ok(contents) => print!("{contents}"),
                Err(_) => println!("(no .chronologignore file; default patterns apply)"),
            }
        }
        IgnoreAction::Init => {
            let repo = open_repo()?;
            chronolog_core::ignore::write_default_ignore_file(repo.root())
                .context("writing .chronologignore")?;
            repo.reload_ignore();
            println!("Wrote {}", repo.root().join(".chronologignore").display());
        }
    }
    Ok(())
}

fn cmd_daemon(action: &DaemonAction, json: bool) -> Result<()> {
    let repo = open_repo()?;
    match action {
        DaemonAction::Start => {
            let status = repo.start_daemon().context("starting daemon")?;
            print_daemon_status(&status, json);
        }
        DaemonAction::Stop => {
            let status = repo.stop_daemon().context("stopping daemon")?;
            print_daemon_status(&status, json);
        }
        DaemonAction::Status => {
            let status = repo.daemon_status();
            print_daemon_status(&status, json);
        }
    }
    Ok(())
}

fn print_daemon_status(status: &chronolog_core::supervisor::DaemonStatus, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({"running": status.running, "pid": status.pid})
        );
        return;
    }
    match (status.running, status.pid) {
        (true, Some(pid)) => println!("Daemon running (pid {pid})"),
        _ => println!("Daemon not running"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_digest_handles_empty_head() {
        assert_eq!(short_digest(""), "(empty)");
        assert_eq!(short_digest("abcdefgh12345"), "abcdefgh");
    }
}
