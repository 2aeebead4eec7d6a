//! Semantic (structural) diff (spec.md §4.5).
//!
//! Extracts a flat list of top-level elements (functions, classes,
//! imports) from each side, matches them by `(kind, name)`, and emits
//! ADDED / REMOVED / MODIFIED / RENAMED changes. Python gets a full
//! regex-driven element walk (function defs, class defs, imports);
//! JavaScript/TypeScript and Java get lighter regex heuristics. Every
//! other suffix has no parser entry and the caller falls back to line
//! diff (spec.md §4.5 `[FULL]`, mirroring the Python original's
//! `_fallback_diff`).

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Recognized languages for structural extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    Java,
}

/// Map a repo-relative path's suffix to a recognized language, or `None`
/// if unsupported (spec.md §4.5 `[FULL]`: `SUPPORTED_LANGUAGES`).
pub fn language_for_path(path: &str) -> Option<Language> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    match ext.as_str() {
        "py" => Some(Language::Python),
        "js" | "jsx" | "ts" | "tsx" => Some(Language::JavaScript),
        "java" => Some(Language::Java),
        _ => None,
    }
}

/// A single extracted top-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticElement {
    pub kind: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticChangeKind {
    Added,
    Removed,
    Modified,
    Renamed,
}

#[derive(Debug, Clone)]
pub struct SemanticChange {
    pub kind: SemanticChangeKind,
    pub element_kind: String,
    pub old: Option<SemanticElement>,
    pub new: Option<SemanticElement>,
}

// ---------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------

fn python_patterns() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"^(\s*)def\s+(\w+)\s*\(([^)]*)\)").unwrap(),
            Regex::new(r"^(\s*)class\s+(\w+)").unwrap(),
            Regex::new(r"^\s*(?:import\s+(\S+)|from\s+(\S+)\s+import)").unwrap(),
        )
    })
}

fn js_patterns() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"^\s*(?:export\s+)?function\s+(\w+)\s*\(([^)]*)\)").unwrap(),
            Regex::new(r"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>").unwrap(),
            Regex::new(r"^\s*(?:export\s+)?class\s+(\w+)").unwrap(),
        )
    })
}

fn java_patterns() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"^\s*(?:public|private|protected|static|final|\s)*\b\w[\w<>\[\]]*\s+(\w+)\s*\(([^)]*)\)\s*\{?\s*$").unwrap(),
            Regex::new(r"^\s*(?:public|private|protected|\s)*(?:class|interface)\s+(\w+)").unwrap(),
        )
    })
}

/// Extract top-level elements from `text` in the given `language`.
pub fn extract_elements(language: Language, text: &str) -> Vec<SemanticElement> {
    match language {
        Language::Python => extract_python(text),
        Language::JavaScript => extract_js(text),
        Language::Java => extract_java(text),
    }
}

fn extract_python(text: &str) -> Vec<SemanticElement> {
    let (def_re, class_re, import_re) = python_patterns();
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = def_re.captures(line) {
            let indent = caps[1].len();
            let name = caps[2].to_string();
            let params = caps[3].to_string();
            out.push(SemanticElement {
                kind: "function".to_string(),
                name,
                start_line: i + 1,
                end_line: python_block_end(&lines, i, indent),
                signature: Some(params),
            });
        } else if let Some(caps) = class_re.captures(line) {
            let indent = caps[1].len();
            out.push(SemanticElement {
                kind: "class".to_string(),
                name: caps[2].to_string(),
                start_line: i + 1,
                end_line: python_block_end(&lines, i, indent),
                signature: None,
            });
        } else if let Some(caps) = import_re.captures(line) {
            let module = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            out.push(SemanticElement {
                kind: "import".to_string(),
                name: module.clone(),
                start_line: i + 1,
                end_line: i + 1,
                signature: Some(module),
            });
        }
    }
    out
}

/// A Python block ends at the last contiguous line more indented than its
/// header, or end of file.
fn python_block_end(lines: &[&str], start: usize, header_indent: usize) -> usize {
    let mut end = start + 1;
    for (offset, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent <= header_indent {
            break;
        }
        end = offset + 1;
    }
    end
}

fn extract_js(text: &str) -> Vec<SemanticElement> {
    let (func_re, arrow_re, class_re) = js_patterns();
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = func_re.captures(line) {
            out.push(SemanticElement {
                kind: "function".to_string(),
                name: caps[1].to_string(),
                start_line: i + 1,
                end_line: brace_block_end(&lines, i),
                signature: Some(caps[2].to_string()),
            });
        } else if let Some(caps) = arrow_re.captures(line) {
            out.push(SemanticElement {
                kind: "function".to_string(),
                name: caps[1].to_string(),
                start_line: i + 1,
                end_line: brace_block_end(&lines, i),
                signature: Some(caps[2].to_string()),
            });
        } else if let Some(caps) = class_re.captures(line) {
            out.push(SemanticElement {
                kind: "class".to_string(),
                name: caps[1].to_string(),
                start_line: i + 1,
                end_line: brace_block_end(&lines, i),
                signature: None,
            });
        }
    }
    out
}

fn extract_java(text: &str) -> Vec<SemanticElement> {
    let (method_re, type_re) = java_patterns();
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = type_re.captures(line) {
            out.push(SemanticElement {
                kind: "class".to_string(),
                name: caps[1].to_string(),
                start_line: i + 1,
                end_line: brace_block_end(&lines, i),
                signature: None,
            });
        } else if let Some(caps) = method_re.captures(line) {
            // Skip control-flow keywords that can look like method heads.
            if matches!(&caps[1], "if" | "for" | "while" | "switch" | "catch") {
                continue;
            }
            out.push(SemanticElement {
                kind: "method".to_string(),
                name: caps[1].to_string(),
                start_line: i + 1,
                end_line: brace_block_end(&lines, i),
                signature: Some(caps[2].to_string()),
            });
        }
    }
    out
}

/// A brace-delimited block ends at the line whose cumulative `{`/`}`
/// count (starting from the header line) returns to zero.
fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    let mut seen_open = false;
    for (offset, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return offset + 1;
        }
    }
    lines.len().max(start + 1)
}

// ---------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------

/// Diff two texts in `language`, matching elements by `(kind, name)` and
/// emitting ADDED/REMOVED/MODIFIED/RENAMED changes. Rename detection
/// pairs a leftover removed and added element sharing both `kind` and
/// `signature` (spec.md §4.5).
pub fn diff_semantic(language: Language, old_text: &str, new_text: &str) -> Vec<SemanticChange> {
    let old_elements = extract_elements(language, old_text);
    let new_elements = extract_elements(language, new_text);

    let mut old_by_key: HashMap<(String, String), SemanticElement> = old_elements
        .into_iter()
        .map(|e| ((e.kind.clone(), e.name.clone()), e))
        .collect();
    let mut new_by_key: HashMap<(String, String), SemanticElement> = new_elements
        .into_iter()
        .map(|e| ((e.kind.clone(), e.name.clone()), e))
        .collect();

    let shared_keys: Vec<(String, String)> = old_by_key
        .keys()
        .filter(|k| new_by_key.contains_key(*k))
        .cloned()
        .collect();

    let mut changes = Vec::new();
    for key in shared_keys {
        let old = old_by_key.remove(&key).unwrap();
        let new = new_by_key.remove(&key).unwrap();
        if old.signature != new.signature {
            changes.push(SemanticChange {
                kind: SemanticChangeKind::Modified,
                element_kind: key.0,
                old: Some(old),
                new: Some(new),
            });
        }
    }

    // Remaining entries are candidates for rename pairing.
    let mut removed: Vec<SemanticElement> = old_by_key.into_values().collect();
    let mut added: Vec<SemanticElement> = new_by_key.into_values().collect();

    let mut i = 0;
    while i < removed.len() {
        let r = &removed[i];
        if let Some(j) = added
            .iter()
            .position(|a| a.kind == r.kind && a.signature == r.signature && a.name != r.name)
        {
            let a = added.remove(j);
            let r = removed.remove(i);
            changes.push(SemanticChange {
                kind: SemanticChangeKind::Renamed,
                element_kind: r.kind.clone(),
                old: Some(r),
                new: Some(a),
            });
        } else {
            i += 1;
        }
    }

    for r in removed {
        changes.push(SemanticChange {
            kind: SemanticChangeKind::Removed,
            element_kind: r.kind.clone(),
            old: Some(r),
            new: None,
        });
    }
    for a in added {
        changes.push(SemanticChange {
            kind: SemanticChangeKind::Added,
            element_kind: a.kind.clone(),
            old: None,
            new: Some(a),
        });
    }

    changes.sort_by(|a, b| {
        let a_line = a.old.as_ref().or(a.new.as_ref()).map(|e| e.start_line).unwrap_or(0);
        let b_line = b.old.as_ref().or(b.new.as_ref()).map(|e| e.start_line).unwrap_or(0);
        a_line.cmp(&b_line)
    });
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_for_path_recognizes_python() {
        assert_eq!(language_for_path("main.py"), Some(Language::Python));
        assert_eq!(language_for_path("app.tsx"), Some(Language::JavaScript));
        assert_eq!(language_for_path("Main.java"), Some(Language::Java));
        assert_eq!(language_for_path("notes.txt"), None);
    }

    #[test]
    fn python_extracts_function_and_class() {
        let src = "def foo(a, b):\n    return a + b\n\nclass Bar:\n    pass\n";
        let elements = extract_elements(Language::Python, src);
        assert!(elements.iter().any(|e| e.kind == "function" && e.name == "foo"));
        assert!(elements.iter().any(|e| e.kind == "class" && e.name == "Bar"));
    }

    #[test]
    fn python_added_function_is_reported() {
        let old = "def foo():\n    pass\n";
        let new = "def foo():\n    pass\n\ndef bar():\n    pass\n";
        let changes = diff_semantic(Language::Python, old, new);
        assert!(changes
            .iter()
            .any(|c| matches!(c.kind, SemanticChangeKind::Added) && c.new.as_ref().unwrap().name == "bar"));
    }

    #[test]
    fn python_signature_change_is_modified() {
        let old = "def foo(a):\n    pass\n";
        let new = "def foo(a, b):\n    pass\n";
        let changes = diff_semantic(Language::Python, old, new);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].kind, SemanticChangeKind::Modified));
    }

    #[test]
    fn rename_detected_by_matching_signature() {
        let old = "def foo(a, b):\n    pass\n";
        let new = "def renamed(a, b):\n    pass\n";
        let changes = diff_semantic(Language::Python, old, new);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].kind, SemanticChangeKind::Renamed));
    }

    #[test]
    fn js_extracts_function_class_and_arrow() {
        let src = "function foo(x) {\n  return x;\n}\n\nconst bar = (y) => y * 2;\n\nclass Baz {}\n";
        let elements = extract_elements(Language::JavaScript, src);
        assert!(elements.iter().any(|e| e.name == "foo"));
        assert!(elements.iter().any(|e| e.name == "bar"));
        assert!(elements.iter().any(|e| e.name == "Baz" && e.kind == "class"));
    }

    #[test]
    fn java_extracts_class_and_method() {
        let src = "public class Foo {\n    public void bar(int x) {\n        return;\n    }\n}\n";
        let elements = extract_elements(Language::Java, src);
        assert!(elements.iter().any(|e| e.kind == "class" && e.name == "Foo"));
        assert!(elements.iter().any(|e| e.kind == "method" && e.name == "bar"));
    }
}
