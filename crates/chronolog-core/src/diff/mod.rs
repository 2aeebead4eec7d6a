//! Diff engines (spec.md §4.5, C5): line, word, semantic, and binary diff
//! producers, modeled as a sum type with one entry point rather than
//! runtime polymorphism over separate engine types (spec.md §9).

pub mod binary;
pub mod line;
mod lcs;
pub mod semantic;
pub mod word;

pub use binary::BinaryDiffReport;
pub use line::LineDiffLine;
pub use semantic::{SemanticChange, SemanticChangeKind};
pub use word::{WordOp, WordToken};

/// Which diff algorithm to run (spec.md §9: `DiffKind = Line | Word |
/// Semantic | Binary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Line,
    Word,
    Semantic,
    Binary,
}

/// The result of [`diff`], tagged by which algorithm actually ran (which
/// may differ from the requested [`DiffKind`] after a fallback).
#[derive(Debug, Clone)]
pub enum DiffOutput {
    Line {
        header_a: String,
        header_b: String,
        lines: Vec<LineDiffLine>,
    },
    Word {
        ops: Vec<WordOp>,
    },
    Semantic {
        changes: Vec<SemanticChange>,
    },
    Binary(BinaryDiffReport),
}

/// Header metadata shared by every diff request.
#[derive(Debug, Clone, Default)]
pub struct DiffHeader {
    pub path: Option<String>,
    pub digest_a: Option<String>,
    pub digest_b: Option<String>,
}

/// Run `kind` over `a`/`b`. If the requested kind is line/word/semantic
/// and either side fails to decode as UTF-8, falls back to binary (spec.md
/// §4.4). If `kind` is semantic and the path's suffix isn't recognized,
/// falls back to line diff (spec.md §4.4, §4.5 `[FULL]`).
pub fn diff(kind: DiffKind, a: &[u8], b: &[u8], header: &DiffHeader) -> DiffOutput {
    match kind {
        DiffKind::Binary => DiffOutput::Binary(binary::diff_binary(a, b, header.path.as_deref())),
        DiffKind::Line | DiffKind::Word | DiffKind::Semantic => {
            let (Ok(a_str), Ok(b_str)) = (std::str::from_utf8(a), std::str::from_utf8(b)) else {
                return DiffOutput::Binary(binary::diff_binary(a, b, header.path.as_deref()));
            };
            match kind {
                DiffKind::Line => DiffOutput::Line {
                    header_a: line::side_header(header.path.as_deref(), header.digest_a.as_deref()),
                    header_b: line::side_header(header.path.as_deref(), header.digest_b.as_deref()),
                    lines: line::diff_lines(a_str, b_str, 3),
                },
                DiffKind::Word => DiffOutput::Word {
                    ops: word::diff_words(a_str, b_str),
                },
                DiffKind::Semantic => {
                    match header.path.as_deref().and_then(semantic::language_for_path) {
                        Some(lang) => DiffOutput::Semantic {
                            changes: semantic::diff_semantic(lang, a_str, b_str),
                        },
                        None => DiffOutput::Line {
                            header_a: line::side_header(
                                header.path.as_deref(),
                                header.digest_a.as_deref(),
                            ),
                            header_b: line::side_header(
                                header.path.as_deref(),
                                header.digest_b.as_deref(),
                            ),
                            lines: line::diff_lines(a_str, b_str, 3),
                        },
                    }
                }
                DiffKind::Binary => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_bytes_fall_back_from_line_kind() {
        let a: &[u8] = b"hello\xff\xfe\x00world";
        let b: &[u8] = b"hello\xff\xfe\x00there";
        let header = DiffHeader::default();
        match diff(DiffKind::Line, a, b, &header) {
            DiffOutput::Binary(_) => {}
            other => panic!("expected binary fallback, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_suffix_falls_back_to_line() {
        let header = DiffHeader {
            path: Some("notes.xyz".to_string()),
            ..Default::default()
        };
        match diff(DiffKind::Semantic, b"a\n", b"b\n", &header) {
            DiffOutput::Line { .. } => {}
            other => panic!("expected line fallback, got {other:?}"),
        }
    }
}
