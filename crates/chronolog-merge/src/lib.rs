//! chronolog-merge: three-way merge with conflict regions (spec.md §4.6, C6).
//!
//! Pure and synchronous — no I/O, no database, no async runtime. Given
//! three byte slices (`base`, `ours`, `theirs`) and an optional path hint,
//! [`merge`] returns a [`MergeResult`] describing either a clean merge or
//! the conflict regions a caller must resolve.

mod diff3;
mod resolve;

use serde::{Deserialize, Serialize};

pub use resolve::{
    apply_resolution, auto_resolve, auto_resolve_content, has_conflicts, resolve_conflict,
    ConflictResolution,
};

const NUL_SNIFF_WINDOW: usize = 8192;

/// Which algorithm produced a [`MergeResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeKind {
    Text,
    Binary,
}

/// A contiguous range of base lines both sides edited differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub base_content: String,
    pub our_content: String,
    pub their_content: String,
}

/// Free-form metadata surfaced alongside a merge outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeMetadata {
    pub path: Option<String>,
    pub base_len: usize,
    pub our_len: usize,
    pub their_len: usize,
}

/// Outcome of a three-way merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    /// Merged bytes when `success` — text results are UTF-8, binary
    /// results are the literal winning side's bytes.
    #[serde(with = "serde_bytes_opt")]
    pub content: Option<Vec<u8>>,
    pub conflicts: Vec<ConflictRegion>,
    pub kind: Option<MergeKind>,
    pub metadata: MergeMetadata,
}

/// `MergeResult.content` crosses the CLI/library boundary as JSON for
/// `chronolog merge --json` (spec.md §10 ambient-stack decision: anything
/// serialized to cross that boundary uses `serde`); base64-encoding the
/// raw bytes through the real `base64` crate keeps binary merge content
/// representable in JSON without inventing a codec.
mod serde_bytes_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = serde::Deserialize::deserialize(d)?;
        s.map(|s| STANDARD.decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

fn has_nul(data: &[u8]) -> bool {
    data[..data.len().min(NUL_SNIFF_WINDOW)].contains(&0)
}

/// Three-way merge of `base`, `ours`, `theirs`.
pub fn merge(base: &[u8], ours: &[u8], theirs: &[u8], path: Option<&str>) -> MergeResult {
    let metadata = MergeMetadata {
        path: path.map(|p| p.to_string()),
        base_len: base.len(),
        our_len: ours.len(),
        their_len: theirs.len(),
    };

    if has_nul(base) || has_nul(ours) || has_nul(theirs) {
        return merge_binary(base, ours, theirs, metadata);
    }

    let (Ok(base_str), Ok(our_str), Ok(their_str)) = (
        std::str::from_utf8(base),
        std::str::from_utf8(ours),
        std::str::from_utf8(theirs),
    ) else {
        return merge_binary(base, ours, theirs, metadata);
    };

    merge_text(base_str, our_str, their_str, metadata)
}

fn merge_binary(base: &[u8], ours: &[u8], theirs: &[u8], metadata: MergeMetadata) -> MergeResult {
    if ours == theirs {
        return MergeResult {
            success: true,
            content: Some(ours.to_vec()),
            conflicts: Vec::new(),
            kind: Some(MergeKind::Binary),
            metadata,
        };
    }
    if ours == base {
        return MergeResult {
            success: true,
            content: Some(theirs.to_vec()),
            conflicts: Vec::new(),
            kind: Some(MergeKind::Binary),
            metadata,
        };
    }
    if theirs == base {
        return MergeResult {
            success: true,
            content: Some(ours.to_vec()),
            conflicts: Vec::new(),
            kind: Some(MergeKind::Binary),
            metadata,
        };
    }
    MergeResult {
        success: false,
        content: None,
        conflicts: vec![ConflictRegion {
            start_line: 0,
            end_line: 0,
            base_content: String::new(),
            our_content: String::new(),
            their_content: String::new(),
        }],
        kind: Some(MergeKind::Binary),
        metadata,
    }
}

fn merge_text(base: &str, ours: &str, theirs: &str, metadata: MergeMetadata) -> MergeResult {
    let base_lines: Vec<&str> = split_lines(base);
    let our_edits = diff3::compute_edits(&base_lines, &split_lines(ours));
    let their_edits = diff3::compute_edits(&base_lines, &split_lines(theirs));

    let mut conflicting_ours = Vec::new();
    let mut conflicting_theirs = Vec::new();
    for oe in &our_edits {
        if their_edits.iter().any(|te| diff3::overlaps(oe, te)) {
            conflicting_ours.push(oe.clone());
        }
    }
    for te in &their_edits {
        if our_edits.iter().any(|oe| diff3::overlaps(oe, te)) {
            conflicting_theirs.push(te.clone());
        }
    }

    if conflicting_ours.is_empty() && conflicting_theirs.is_empty() {
        let merged = apply_all_edits(&base_lines, &our_edits, &their_edits);
        return MergeResult {
            success: true,
            content: Some(merged.join("\n").into_bytes()),
            conflicts: Vec::new(),
            kind: Some(MergeKind::Text),
            metadata,
        };
    }

    let (content, conflicts) = render_with_conflicts(&base_lines, &our_edits, &their_edits);
    MergeResult {
        success: false,
        content: Some(content.into_bytes()),
        conflicts,
        kind: Some(MergeKind::Text),
        metadata,
    }
}

fn split_lines(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split('\n').collect()
}

/// Apply non-conflicting edits from both sides to `base_lines`, in base order.
fn apply_all_edits(base_lines: &[&str], our_edits: &[diff3::Edit], their_edits: &[diff3::Edit]) -> Vec<String> {
    let mut all: Vec<&diff3::Edit> = our_edits.iter().chain(their_edits.iter()).collect();
    all.sort_by_key(|e| e.start);

    let mut out = Vec::new();
    let mut cursor = 0usize;
    for edit in all {
        if edit.start < cursor {
            continue; // already covered by an earlier (identical) edit
        }
        out.extend(base_lines[cursor..edit.start].iter().map(|s| s.to_string()));
        out.extend(edit.replacement.iter().cloned());
        cursor = edit.end;
    }
    out.extend(base_lines[cursor..].iter().map(|s| s.to_string()));
    out
}

/// Render merged content with `<<<<<<< OURS / ======= / >>>>>>> THEIRS`
/// markers around each conflicting region (spec.md §6).
fn render_with_conflicts(
    base_lines: &[&str],
    our_edits: &[diff3::Edit],
    their_edits: &[diff3::Edit],
) -> (String, Vec<ConflictRegion>) {
    let mut events: Vec<(usize, usize, &diff3::Edit, bool)> = Vec::new();
    for e in our_edits {
        events.push((e.start, e.end, e, true));
    }
    for e in their_edits {
        events.push((e.start, e.end, e, false));
    }
    events.sort_by_key(|(start, ..)| *start);

    let mut out = Vec::new();
    let mut conflicts = Vec::new();
    let mut cursor = 0usize;
    let mut i = 0;
    while i < events.len() {
        let (start, end, _edit, _is_ours) = events[i];
        if start < cursor {
            i += 1;
            continue;
        }
        out.extend(base_lines[cursor..start].iter().map(|s| s.to_string()));

        // Gather every edit whose range overlaps [start, end) to find the
        // true extent of this conflict cluster.
        let mut cluster_end = end;
        let mut j = i + 1;
        while j < events.len() && events[j].0 < cluster_end {
            cluster_end = cluster_end.max(events[j].1);
            j += 1;
        }

        let our_edit = our_edits.iter().find(|e| e.start < cluster_end && cursor.max(start) < e.end);
        let their_edit = their_edits.iter().find(|e| e.start < cluster_end && cursor.max(start) < e.end);

        let base_slice = base_lines[start.min(cluster_end)..cluster_end].join("\n");
        let our_text = our_edit.map(|e| e.replacement.join("\n")).unwrap_or_else(|| base_slice.clone());
        let their_text = their_edit.map(|e| e.replacement.join("\n")).unwrap_or_else(|| base_slice.clone());

        if our_text == their_text {
            out.push(our_text.clone());
        } else {
            out.push("<<<<<<< OURS".to_string());
            out.push(our_text.clone());
            out.push("=======".to_string());
            out.push(their_text.clone());
            out.push(">>>>>>> THEIRS".to_string());
            conflicts.push(ConflictRegion {
                start_line: start,
                end_line: cluster_end,
                base_content: base_slice,
                our_content: our_text,
                their_content: their_text,
            });
        }

        cursor = cluster_end;
        i = j;
    }
    out.extend(base_lines[cursor..].iter().map(|s| s.to_string()));
    (out.join("\n"), conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_overlapping_edits_merge_cleanly() {
        let base = b"A\nB\nC\n";
        let ours = b"A\nB2\nC\n";
        let theirs = b"A\nB\nC2\n";
        let result = merge(base, ours, theirs, None);
        assert!(result.success);
        assert_eq!(result.content.unwrap(), b"A\nB2\nC2\n".to_vec());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn overlapping_edits_conflict() {
        let base = b"A\nB\nC\n";
        let ours = b"A\nB2\nC\n";
        let theirs = b"A\nB3\nC\n";
        let result = merge(base, ours, theirs, None);
        assert!(!result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].start_line, 1);
    }

    #[test]
    fn identical_sides_never_conflict() {
        let base = b"A\nB\n";
        let ours = b"A\nB2\n";
        let theirs = b"A\nB2\n";
        let result = merge(base, ours, theirs, None);
        assert!(result.success);
        assert_eq!(result.content.unwrap(), b"A\nB2\n".to_vec());
    }

    #[test]
    fn binary_merge_one_side_unchanged() {
        let base = [0u8, 1, 2, 3];
        let ours = [0u8, 1, 2, 3];
        let theirs = [9u8, 9, 9, 9];
        let result = merge(&base, &ours, &theirs, None);
        assert!(result.success);
        assert_eq!(result.kind, Some(MergeKind::Binary));
        assert_eq!(result.content.unwrap(), theirs.to_vec());
    }

    #[test]
    fn binary_merge_both_sides_diverge_conflicts() {
        let base = [0u8, 1, 2, 3];
        let ours = [1u8, 1, 2, 3];
        let theirs = [2u8, 1, 2, 3];
        let result = merge(&base, &ours, &theirs, None);
        assert!(!result.success);
        assert_eq!(result.kind, Some(MergeKind::Binary));
    }

    #[test]
    fn merge_result_round_trips_through_json_with_non_utf8_content() {
        let base = [0u8, 1, 2, 3];
        let ours = [0u8, 1, 2, 3];
        let theirs = [9u8, 9, 9, 9];
        let result = merge(&base, &ours, &theirs, Some("binary.dat"));

        let json = serde_json::to_string(&result).unwrap();
        let decoded: MergeResult = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.success, result.success);
        assert_eq!(decoded.kind, result.kind);
        assert_eq!(decoded.content, result.content);
        assert_eq!(decoded.content.unwrap(), theirs.to_vec());
    }

    #[test]
    fn auto_resolve_prefers_changed_side() {
        let region = ConflictRegion {
            start_line: 0,
            end_line: 1,
            base_content: "x".into(),
            our_content: "x".into(),
            their_content: "y".into(),
        };
        assert!(matches!(auto_resolve(&region), Some(ConflictResolution::Theirs)));
    }

    #[test]
    fn auto_resolve_prefers_non_empty_side() {
        let ours_wins = ConflictRegion {
            start_line: 0,
            end_line: 1,
            base_content: String::new(),
            our_content: "added line".into(),
            their_content: String::new(),
        };
        assert!(matches!(auto_resolve(&ours_wins), Some(ConflictResolution::Ours)));

        let theirs_wins = ConflictRegion {
            start_line: 0,
            end_line: 1,
            base_content: String::new(),
            our_content: String::new(),
            their_content: "added line".into(),
        };
        assert!(matches!(auto_resolve(&theirs_wins), Some(ConflictResolution::Theirs)));
    }

    #[test]
    fn auto_resolve_prefers_self_consistent_indentation() {
        // Same content once stripped, but "ours" indents uniformly with tabs
        // while "theirs" mixes tab and space indentation — "theirs" is also
        // numerically closer to base in raw leading-whitespace count, which
        // is why a naive distance-from-base heuristic picks the wrong side.
        let region = ConflictRegion {
            start_line: 0,
            end_line: 2,
            base_content: " fn f() {\n  body();\n }".into(),
            our_content: "\tfn f() {\n\tbody();\n\t}".into(),
            their_content: "\tfn f() {\n body();\n\t}".into(),
        };
        assert!(matches!(auto_resolve(&region), Some(ConflictResolution::Ours)));
    }
}
