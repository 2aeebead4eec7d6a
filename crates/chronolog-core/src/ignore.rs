//! Pattern-based path filtering (spec.md §4.3, C3).
//!
//! Loads `.chronologignore` (gitignore syntax, without `!` negation
//! support) and merges it with a small hard-coded default pattern set.
//! Also exposes the "looks binary" heuristic the watcher uses to keep
//! non-text blobs out of the search index.

use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

/// Patterns merged in regardless of what `.chronologignore` contains
/// (spec.md §3: "Always includes a fixed default set covering the
/// repository's own metadata directory, common editor/VCS junk, and
/// language caches").
const DEFAULT_PATTERNS: &[&str] = &[
    ".chronolog/",
    ".git/",
    "__pycache__/",
    "*.pyc",
    "node_modules/",
    "target/",
    "*.swp",
    "*.swo",
    "*~",
    ".DS_Store",
    "*.class",
    "*.o",
    ".idea/",
];

/// The name of the ignore file consulted in the repository root.
pub const IGNORE_FILE_NAME: &str = ".chronologignore";

/// First N bytes sniffed for a NUL byte to decide "this looks binary".
const BINARY_SNIFF_WINDOW: usize = 1024;

/// A single compiled gitignore-style pattern.
#[derive(Debug, Clone)]
struct Pattern {
    /// Regex compiled from the glob.
    regex: regex::Regex,
    /// Whether the pattern only matches directories (trailing `/`).
    dir_only: bool,
    /// Whether the pattern is anchored to the repository root (contains a
    /// `/` other than a trailing one, per gitignore semantics).
    anchored: bool,
}

impl Pattern {
    fn compile(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        // Leading `!` negation is explicitly NOT supported (spec.md §4.3);
        // such lines are loaded but never match, rather than silently
        // dropped, so a reload is visibly inert for them.
        if trimmed.starts_with('!') {
            return None;
        }

        let dir_only = trimmed.ends_with('/');
        let body = trimmed.trim_end_matches('/');
        let anchored = body.contains('/');
        let glob = body.trim_start_matches('/');

        let regex = glob_to_regex(glob, anchored);
        Some(Self {
            regex: regex::Regex::new(&regex).ok()?,
            dir_only,
            anchored,
        })
    }

    /// Does this pattern match `path` (repo-relative, forward-slash
    /// normalized)? `is_dir` is best-effort; when unknown, treat the path
    /// as a file and also try matching each of its ancestor directories so
    /// a directory pattern like `target/` still matches
    /// `target/debug/build.rs`.
    fn matches(&self, path: &str) -> bool {
        if self.anchored {
            if self.regex.is_match(path) {
                return true;
            }
        } else {
            // Unanchored patterns match the basename at any depth.
            if self.regex.is_match(path) {
                return true;
            }
            if let Some(last) = path.rsplit('/').next() {
                if self.regex.is_match(last) {
                    return true;
                }
            }
        }
        if self.dir_only {
            // Directory patterns also match anything nested under them.
            let prefix_variants = [format!("{path}/"), path.to_string()];
            for segment in path.split('/') {
                if self.regex.is_match(segment) {
                    return true;
                }
            }
            for variant in &prefix_variants {
                if variant.split('/').any(|seg| self.regex.is_match(seg)) {
                    return true;
                }
            }
        }
        false
    }
}

/// Translate a gitignore-style glob (`*`, `?`, `**`) into an anchored regex.
fn glob_to_regex(glob: &str, anchored: bool) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    let _ = anchored;
    out
}

/// Gitignore-style path filter with a built-in default pattern set.
pub struct IgnoreEngine {
    patterns: Vec<Pattern>,
    ignore_file: std::path::PathBuf,
}

impl IgnoreEngine {
    /// Load patterns from `<repo_root>/.chronologignore`, merged with
    /// [`DEFAULT_PATTERNS`]. A missing ignore file is not an error — the
    /// defaults alone are used.
    #[instrument(skip_all)]
    pub fn load(repo_root: impl AsRef<Path>) -> Self {
        let ignore_file = repo_root.as_ref().join(IGNORE_FILE_NAME);
        let mut engine = Self {
            patterns: Vec::new(),
            ignore_file,
        };
        engine.reload();
        engine
    }

    /// Re-read the ignore file from disk, recompiling the pattern set.
    /// Triggered by the watcher when it observes a write to the ignore
    /// file itself (spec.md §4.3).
    pub fn reload(&mut self) {
        let mut patterns: Vec<Pattern> = DEFAULT_PATTERNS
            .iter()
            .filter_map(|p| Pattern::compile(p))
            .collect();

        if let Ok(contents) = fs::read_to_string(&self.ignore_file) {
            for line in contents.lines() {
                if let Some(p) = Pattern::compile(line) {
                    patterns.push(p);
                }
            }
        }
        debug!(count = patterns.len(), "ignore patterns (re)loaded");
        self.patterns = patterns;
    }

    /// Whether `basename` is the ignore file itself, used by the watcher
    /// to decide when to call [`Self::reload`].
    pub fn is_ignore_file(&self, path: &Path) -> bool {
        path.file_name().map(|n| n == IGNORE_FILE_NAME).unwrap_or(false)
    }

    /// Whether `path` (repo-relative, forward-slash normalized) matches
    /// any loaded pattern.
    pub fn should_ignore(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Coarse binary sniff: does the first 1 KiB of `data` contain a NUL byte?
/// Used by the watcher (spec.md §4.7) so the search indexer never sees
/// non-text blobs.
pub fn looks_binary(data: &[u8]) -> bool {
    data[..data.len().min(BINARY_SNIFF_WINDOW)].contains(&0)
}

/// Write the default, heavily-commented `.chronologignore` file used by
/// `ignore init` (spec.md §4.3 `[FULL]`). This is a superset of
/// [`DEFAULT_PATTERNS`] meant for the user to read and edit; it is not
/// itself consulted by [`IgnoreEngine`] unless present on disk.
pub fn default_ignore_file_contents() -> &'static str {
    r#"# ChronoLog ignore patterns (gitignore syntax, no `!` negation support)

# ChronoLog / VCS metadata
.chronolog/
.git/
.svn/
.hg/

# Language caches
__pycache__/
*.pyc
node_modules/
target/
.venv/
vendor/

# IDE / editor junk
.idea/
.vscode/
*.swp
*.swo
*~

# OS junk
.DS_Store
Thumbs.db

# Build outputs
dist/
build/
*.o
*.class

# Logs and temp files
*.log
*.tmp
*.temp

# Large archives
*.zip
*.tar
*.tar.gz
*.tgz
*.7z
"#
}

/// Create `.chronologignore` at `repo_root` with the default contents.
/// Used by `init` and `ignore init` (spec.md §4.4).
pub fn write_default_ignore_file(repo_root: impl AsRef<Path>) -> std::io::Result<()> {
    fs::write(
        repo_root.as_ref().join(IGNORE_FILE_NAME),
        default_ignore_file_contents(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_ignore_metadata_dir() {
        let dir = tempfile::tempdir().unwrap();
        let engine = IgnoreEngine::load(dir.path());
        assert!(engine.should_ignore(".chronolog/history.db"));
        assert!(engine.should_ignore("src/__pycache__/mod.pyc"));
    }

    #[test]
    fn tracked_file_is_not_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let engine = IgnoreEngine::load(dir.path());
        assert!(!engine.should_ignore("src/main.rs"));
    }

    #[test]
    fn custom_pattern_from_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(IGNORE_FILE_NAME), "*.secret\nbuild/\n").unwrap();
        let engine = IgnoreEngine::load(dir.path());
        assert!(engine.should_ignore("keys/api.secret"));
        assert!(engine.should_ignore("build/output.bin"));
        assert!(!engine.should_ignore("src/lib.rs"));
    }

    #[test]
    fn negation_lines_are_inert() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(IGNORE_FILE_NAME), "*.log\n!keep.log\n").unwrap();
        let engine = IgnoreEngine::load(dir.path());
        // `!keep.log` is loaded but never matches (negation unsupported);
        // `keep.log` still matches the `*.log` pattern.
        assert!(engine.should_ignore("keep.log"));
    }

    #[test]
    fn reload_picks_up_new_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = IgnoreEngine::load(dir.path());
        assert!(!engine.should_ignore("scratch.tmp2"));
        fs::write(dir.path().join(IGNORE_FILE_NAME), "*.tmp2\n").unwrap();
        engine.reload();
        assert!(engine.should_ignore("scratch.tmp2"));
    }

    #[test]
    fn is_ignore_file_matches_basename() {
        let dir = tempfile::tempdir().unwrap();
        let engine = IgnoreEngine::load(dir.path());
        assert!(engine.is_ignore_file(Path::new(".chronologignore")));
        assert!(engine.is_ignore_file(&dir.path().join(".chronologignore")));
        assert!(!engine.is_ignore_file(Path::new("main.rs")));
    }

    #[test]
    fn looks_binary_detects_nul_byte() {
        assert!(looks_binary(b"hello\0world"));
        assert!(!looks_binary(b"hello world"));
    }

    #[test]
    fn looks_binary_only_checks_first_window() {
        let mut data = vec![b'a'; BINARY_SNIFF_WINDOW + 10];
        data[BINARY_SNIFF_WINDOW + 5] = 0;
        assert!(!looks_binary(&data));
    }
}
