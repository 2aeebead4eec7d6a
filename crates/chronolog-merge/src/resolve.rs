//! Conflict resolution policies consumed by higher layers (spec.md §4.6).

use crate::ConflictRegion;

/// A policy for collapsing a single [`ConflictRegion`] to a line vector.
#[derive(Debug, Clone)]
pub enum ConflictResolution {
    Ours,
    Theirs,
    /// Concatenate both sides, ours first.
    Both,
    /// Delete the region entirely.
    None,
    /// Replace with caller-supplied lines.
    Manual(Vec<String>),
}

pub fn apply_resolution(region: &ConflictRegion, resolution: &ConflictResolution) -> Vec<String> {
    match resolution {
        ConflictResolution::Ours => split_lines(&region.our_content),
        ConflictResolution::Theirs => split_lines(&region.their_content),
        ConflictResolution::Both => {
            let mut out = split_lines(&region.our_content);
            out.extend(split_lines(&region.their_content));
            out
        }
        ConflictResolution::None => Vec::new(),
        ConflictResolution::Manual(lines) => lines.clone(),
    }
}

/// Attempt an automatic resolution for an otherwise-manual conflict region,
/// porting `conflict_resolver.py::_analyze_conflict_for_auto_resolution`'s
/// rule order exactly: an empty side loses to a non-empty one, identical
/// sides take either, one side unchanged from base loses to the changed
/// side, and a pure per-line-whitespace difference is broken by whichever
/// side indents itself consistently. Returns `None` when no rule applies
/// and a human must decide.
pub fn auto_resolve(region: &ConflictRegion) -> Option<ConflictResolution> {
    if region.our_content.is_empty() && !region.their_content.is_empty() {
        return Some(ConflictResolution::Theirs);
    }
    if !region.our_content.is_empty() && region.their_content.is_empty() {
        return Some(ConflictResolution::Ours);
    }
    if region.our_content == region.their_content {
        return Some(ConflictResolution::Ours);
    }
    if region.our_content == region.base_content {
        return Some(ConflictResolution::Theirs);
    }
    if region.their_content == region.base_content {
        return Some(ConflictResolution::Ours);
    }

    let our_lines: Vec<&str> = region.our_content.lines().collect();
    let their_lines: Vec<&str> = region.their_content.lines().collect();
    let our_stripped: Vec<&str> = our_lines.iter().map(|l| l.trim()).collect();
    let their_stripped: Vec<&str> = their_lines.iter().map(|l| l.trim()).collect();

    if our_stripped == their_stripped {
        // Pure whitespace/indentation difference: prefer whichever side
        // indents itself consistently (uniform tabs-xor-spaces, uniform
        // indent size) when the other doesn't.
        let our_indent = analyze_indentation(&our_lines);
        let their_indent = analyze_indentation(&their_lines);
        if our_indent.consistent && !their_indent.consistent {
            return Some(ConflictResolution::Ours);
        }
        if their_indent.consistent && !our_indent.consistent {
            return Some(ConflictResolution::Theirs);
        }
    }
    None
}

fn split_lines(s: &str) -> Vec<String> {
    s.lines().map(|l| l.to_string()).collect()
}

/// Result of [`analyze_indentation`]: whether a block of lines indents
/// itself with one consistent whitespace style, ported from
/// `conflict_resolver.py::_analyze_indentation`.
struct IndentAnalysis {
    consistent: bool,
}

fn analyze_indentation(lines: &[&str]) -> IndentAnalysis {
    let mut saw_tabs = false;
    let mut saw_spaces = false;
    let mut sizes: Vec<usize> = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let leading_tabs = line.chars().take_while(|c| *c == '\t').count();
        let leading_spaces = line.chars().take_while(|c| *c == ' ').count();
        if leading_tabs > 0 {
            saw_tabs = true;
            sizes.push(leading_tabs);
        } else if leading_spaces > 0 {
            saw_spaces = true;
            sizes.push(leading_spaces);
        }
    }

    let consistent_type = !(saw_tabs && saw_spaces);
    let consistent_size = sizes.windows(2).all(|w| w[0] == w[1]);
    IndentAnalysis { consistent: consistent_type && consistent_size }
}

const OURS_MARKER: &str = "<<<<<<< OURS";
const SEPARATOR_MARKER: &str = "=======";
const THEIRS_MARKER: &str = ">>>>>>> THEIRS";

/// Cheap substance check for any conflict marker (spec.md §4.6 `[FULL]`).
pub fn has_conflicts(content: &str) -> bool {
    content.contains(OURS_MARKER) || content.contains(SEPARATOR_MARKER) || content.contains(THEIRS_MARKER)
}

/// Re-walk conflict-marked content line by line, replacing every marked
/// region with `resolution` applied to its (ours, theirs) pair (spec.md
/// §4.6 `[FULL]`). Content with no markers is returned unchanged.
pub fn resolve_conflict(content: &str, resolution: &ConflictResolution) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i] == OURS_MARKER {
            i += 1;
            let mut ours = Vec::new();
            while i < lines.len() && lines[i] != SEPARATOR_MARKER {
                ours.push(lines[i]);
                i += 1;
            }
            i += 1; // skip separator
            let mut theirs = Vec::new();
            while i < lines.len() && lines[i] != THEIRS_MARKER {
                theirs.push(lines[i]);
                i += 1;
            }
            i += 1; // skip theirs marker

            let region = ConflictRegion {
                start_line: 0,
                end_line: 0,
                base_content: String::new(),
                our_content: ours.join("\n"),
                their_content: theirs.join("\n"),
            };
            out.extend(apply_resolution(&region, resolution));
        } else {
            out.push(lines[i].to_string());
            i += 1;
        }
    }
    out.join("\n")
}

/// Re-walk conflict-marked content, auto-resolving every region that
/// [`auto_resolve`] can decide and leaving the rest marked for a human.
/// Returns the rewritten content and the count of regions still unresolved.
pub fn auto_resolve_content(content: &str) -> (String, usize) {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::new();
    let mut unresolved = 0usize;
    let mut i = 0;
    while i < lines.len() {
        if lines[i] == OURS_MARKER {
            let marker_start = i;
            i += 1;
            let mut ours = Vec::new();
            while i < lines.len() && lines[i] != SEPARATOR_MARKER {
                ours.push(lines[i]);
                i += 1;
            }
            i += 1; // skip separator
            let mut theirs = Vec::new();
            while i < lines.len() && lines[i] != THEIRS_MARKER {
                theirs.push(lines[i]);
                i += 1;
            }
            i += 1; // skip theirs marker

            let region = ConflictRegion {
                start_line: 0,
                end_line: 0,
                base_content: String::new(),
                our_content: ours.join("\n"),
                their_content: theirs.join("\n"),
            };
            match auto_resolve(&region) {
                Some(resolution) => out.extend(apply_resolution(&region, &resolution)),
                None => {
                    unresolved += 1;
                    out.extend(lines[marker_start..i].iter().map(|l| l.to_string()));
                }
            }
        } else {
            out.push(lines[i].to_string());
            i += 1;
        }
    }
    (out.join("\n"), unresolved)
}

#[cfg(test)]
mod content_level_tests {
    use super::*;

    #[test]
    fn has_conflicts_detects_markers() {
        assert!(has_conflicts("a\n<<<<<<< OURS\nb\n=======\nc\n>>>>>>> THEIRS\nd"));
        assert!(!has_conflicts("a\nb\nc"));
    }

    #[test]
    fn resolve_conflict_takes_ours() {
        let content = "a\n<<<<<<< OURS\nb\n=======\nc\n>>>>>>> THEIRS\nd";
        let resolved = resolve_conflict(content, &ConflictResolution::Ours);
        assert_eq!(resolved, "a\nb\nd");
    }

    #[test]
    fn resolve_conflict_manual_replaces_whole_region() {
        let content = "a\n<<<<<<< OURS\nb\n=======\nc\n>>>>>>> THEIRS\nd";
        let resolved = resolve_conflict(content, &ConflictResolution::Manual(vec!["x".to_string()]));
        assert_eq!(resolved, "a\nx\nd");
    }

    #[test]
    fn resolve_conflict_leaves_unmarked_content_untouched() {
        let content = "a\nb\nc";
        let resolved = resolve_conflict(content, &ConflictResolution::Ours);
        assert_eq!(resolved, content);
    }
}
