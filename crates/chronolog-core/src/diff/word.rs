//! Word-level diff (spec.md §4.5).
//!
//! Tokenizes on whitespace and word/non-word boundaries, then runs LCS
//! over the token arrays to produce `(EQUAL | INSERT | DELETE, text)`
//! triples. For multi-line inputs, lines are first aligned with the
//! shared opcode matcher ([`super::lcs`]) and token-level LCS runs only
//! within each non-equal line opcode, so large equal regions never pay
//! the token-alignment cost.

use regex::Regex;
use std::sync::OnceLock;

use super::lcs::{opcodes, Op};

/// A single aligned token, exposed for callers that want to re-tokenize
/// or inspect boundaries rather than just render `WordOp` text.
pub type WordToken = String;

/// One classified run of token text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordOp {
    Equal(String),
    Insert(String),
    Delete(String),
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+|\s+|[^\w\s]").expect("static token regex"))
}

/// Split `s` into whitespace runs, word runs, and single non-word/
/// non-whitespace characters, preserving every byte so the tokens rejoin
/// to the original string.
pub fn tokenize(s: &str) -> Vec<WordToken> {
    token_regex()
        .find_iter(s)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Diff `a` against `b` at word granularity.
pub fn diff_words(a: &str, b: &str) -> Vec<WordOp> {
    let a_lines: Vec<&str> = split_lines(a);
    let b_lines: Vec<&str> = split_lines(b);
    let line_ops = opcodes(&a_lines, &b_lines);

    let mut out: Vec<WordOp> = Vec::new();
    for op in line_ops {
        match op.op {
            Op::Equal => {
                push_merged(&mut out, WordOp::Equal(a_lines[op.a_start].to_string()));
            }
            Op::Delete => {
                let text = a_lines[op.a_start..op.a_end].join("\n");
                push_merged(&mut out, WordOp::Delete(text));
            }
            Op::Insert => {
                let text = b_lines[op.b_start..op.b_end].join("\n");
                push_merged(&mut out, WordOp::Insert(text));
            }
            Op::Replace => {
                let a_text = a_lines[op.a_start..op.a_end].join("\n");
                let b_text = b_lines[op.b_start..op.b_end].join("\n");
                for triple in token_lcs(&a_text, &b_text) {
                    push_merged(&mut out, triple);
                }
            }
        }
    }
    out
}

/// Token-level LCS between two strings, reusing the shared opcode
/// reduction with tokens as the sequence elements.
fn token_lcs(a: &str, b: &str) -> Vec<WordOp> {
    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);
    let ops = opcodes(&a_tokens, &b_tokens);

    let mut out = Vec::new();
    for op in ops {
        match op.op {
            Op::Equal => out.push(WordOp::Equal(a_tokens[op.a_start].clone())),
            Op::Delete => out.push(WordOp::Delete(a_tokens[op.a_start..op.a_end].concat())),
            Op::Insert => out.push(WordOp::Insert(b_tokens[op.b_start..op.b_end].concat())),
            Op::Replace => {
                out.push(WordOp::Delete(a_tokens[op.a_start..op.a_end].concat()));
                out.push(WordOp::Insert(b_tokens[op.b_start..op.b_end].concat()));
            }
        }
    }
    out
}

/// Merge `next` into the last entry of `out` when they're the same kind,
/// so adjacent runs of the same classification read as one triple.
fn push_merged(out: &mut Vec<WordOp>, next: WordOp) {
    match (out.last_mut(), &next) {
        (Some(WordOp::Equal(prev)), WordOp::Equal(text)) => {
            prev.push('\n');
            prev.push_str(text);
        }
        (Some(WordOp::Insert(prev)), WordOp::Insert(text)) => prev.push_str(text),
        (Some(WordOp::Delete(prev)), WordOp::Delete(text)) => prev.push_str(text),
        _ => out.push(next),
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
    fn tokenize_preserves_bytes() {
        let tokens = tokenize("hello, world!");
        assert_eq!(tokens.concat(), "hello, world!");
    }

    #[test]
    fn identical_text_is_all_equal() {
        let ops = diff_words("the quick fox", "the quick fox");
        assert!(ops.iter().all(|op| matches!(op, WordOp::Equal(_))));
    }

    #[test]
    fn single_word_change_produces_delete_and_insert() {
        let ops = diff_words("the quick fox", "the slow fox");
        assert!(ops.iter().any(|op| matches!(op, WordOp::Delete(s) if s == "quick")));
        assert!(ops.iter().any(|op| matches!(op, WordOp::Insert(s) if s == "slow")));
    }

    #[test]
    fn pure_insertion_line_is_not_token_diffed() {
        let ops = diff_words("a\n", "a\nb\n");
        assert!(ops.iter().any(|op| matches!(op, WordOp::Insert(s) if s == "b")));
    }
}
