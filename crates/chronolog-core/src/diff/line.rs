//! Unified line diff (spec.md §4.5).
//!
//! Uses the shared LCS-to-opcodes reduction ([`super::lcs`], the same
//! algorithm as `chronolog-merge`'s diff3 edit extraction), then renders
//! unified-diff style hunks with a configurable context window (default 3
//! lines).

use super::lcs::{opcodes, Op};

/// One rendered output line, classified for front-end coloring (spec.md
/// §4.5: "Emitter classifies each output line... for coloring by the
/// front-end").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineDiffLine {
    HunkHeader(String),
    Context(String),
    Addition(String),
    Deletion(String),
}

/// Render `a` → `b` as unified-diff-style classified lines with
/// `context` lines of surrounding equal-line context per hunk.
pub fn diff_lines(a: &str, b: &str, context: usize) -> Vec<LineDiffLine> {
    let a_lines: Vec<&str> = split_lines(a);
    let b_lines: Vec<&str> = split_lines(b);
    let ops = opcodes(&a_lines, &b_lines);

    // Group opcodes into hunks: runs of non-equal ops plus up to `context`
    // equal lines of padding on either side.
    let mut hunks: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if op.op == Op::Equal {
            continue;
        }
        if current.is_empty() {
            current.push(idx);
        } else if idx - *current.last().unwrap() <= context * 2 + 1 {
            current.push(idx);
        } else {
            hunks.push(std::mem::take(&mut current));
            current.push(idx);
        }
    }
    if !current.is_empty() {
        hunks.push(current);
    }

    let mut out = Vec::new();
    for hunk in hunks {
        let first = hunk[0];
        let last = *hunk.last().unwrap();

        let hunk_a_start = ops[first].a_start.saturating_sub(context);
        let hunk_a_end = (ops[last].a_end + context).min(a_lines.len());
        let hunk_b_start = ops[first].b_start.saturating_sub(context);
        let hunk_b_end = (ops[last].b_end + context).min(b_lines.len());

        out.push(LineDiffLine::HunkHeader(format!(
            "@@ -{},{} +{},{} @@",
            hunk_a_start + 1,
            hunk_a_end - hunk_a_start,
            hunk_b_start + 1,
            hunk_b_end - hunk_b_start,
        )));

        for line in &a_lines[hunk_a_start..ops[first].a_start] {
            out.push(LineDiffLine::Context(line.to_string()));
        }

        for &idx in &hunk {
            let op = &ops[idx];
            match op.op {
                Op::Equal => {
                    out.push(LineDiffLine::Context(a_lines[op.a_start].to_string()));
                }
                Op::Delete => {
                    for line in &a_lines[op.a_start..op.a_end] {
                        out.push(LineDiffLine::Deletion(line.to_string()));
                    }
                }
                Op::Insert => {
                    for line in &b_lines[op.b_start..op.b_end] {
                        out.push(LineDiffLine::Addition(line.to_string()));
                    }
                }
                Op::Replace => {
                    for line in &a_lines[op.a_start..op.a_end] {
                        out.push(LineDiffLine::Deletion(line.to_string()));
                    }
                    for line in &b_lines[op.b_start..op.b_end] {
                        out.push(LineDiffLine::Addition(line.to_string()));
                    }
                }
            }
        }

        for line in &a_lines[ops[last].a_end..hunk_a_end] {
            out.push(LineDiffLine::Context(line.to_string()));
        }
    }
    out
}

/// Build a `--- path@digest`-style header for one side of a line diff.
pub fn side_header(path: Option<&str>, digest: Option<&str>) -> String {
    let path = path.unwrap_or("<unknown>");
    match digest {
        Some(d) => format!("{path}@{}", &d[..d.len().min(8)]),
        None => path.to_string(),
    }
}

fn split_lines(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split('\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_no_changes() {
        let lines = diff_lines("a\nb\nc\n", "a\nb\nc\n", 3);
        assert!(lines.iter().all(|l| matches!(l, LineDiffLine::Context(_))));
    }

    #[test]
    fn single_line_change_produces_deletion_and_addition() {
        let lines = diff_lines("a\nb\nc\n", "a\nB\nc\n", 3);
        assert!(lines.iter().any(|l| matches!(l, LineDiffLine::Deletion(s) if s == "b")));
        assert!(lines.iter().any(|l| matches!(l, LineDiffLine::Addition(s) if s == "B")));
    }

    #[test]
    fn hunk_header_present_for_changed_region() {
        let lines = diff_lines("a\nb\n", "a\nB\n", 3);
        assert!(matches!(lines[0], LineDiffLine::HunkHeader(_)));
    }

    #[test]
    fn side_header_truncates_digest() {
        let h = side_header(Some("note.txt"), Some("5891b5b522d5df"));
        assert_eq!(h, "note.txt@5891b5b5");
    }
}
