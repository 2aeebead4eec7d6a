//! Line-level edit extraction used by the three-way merge (spec.md §4.6).
//!
//! An [`Edit`] describes a contiguous run of base lines `[start, end)`
//! that one side replaced with `replacement`. Two edits conflict iff
//! their base ranges overlap (spec.md §9 notes a zero-context limitation
//! here: adjacent, non-overlapping edits are never flagged).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: Vec<String>,
}

/// Longest-common-subsequence opcode, Python-`difflib` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Replace,
    Delete,
    Insert,
}

struct Opcode {
    op: Op,
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
}

/// Compute the base→side edits needed to turn `base` into `side`.
pub fn compute_edits(base: &[&str], side: &[&str]) -> Vec<Edit> {
    opcodes(base, side)
        .into_iter()
        .filter(|op| op.op != Op::Equal)
        .map(|op| Edit {
            start: op.a_start,
            end: op.a_end,
            replacement: side[op.b_start..op.b_end].iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

/// Classic dynamic-programming LCS over lines, reduced to opcodes.
fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if a[i] == b[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut i = 0;
    let mut j = 0;
    let mut matches: Vec<(usize, usize)> = Vec::new();
    while i < n && j < m {
        if a[i] == b[j] {
            matches.push((i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    matches.push((n, m));

    let mut ops = Vec::new();
    let (mut prev_i, mut prev_j) = (0usize, 0usize);
    for (mi, mj) in matches {
        let a_run = prev_i..mi;
        let b_run = prev_j..mj;
        if !a_run.is_empty() || !b_run.is_empty() {
            let op = match (a_run.is_empty(), b_run.is_empty()) {
                (true, false) => Op::Insert,
                (false, true) => Op::Delete,
                (false, false) => Op::Replace,
                (true, true) => unreachable!(),
            };
            ops.push(Opcode {
                op,
                a_start: prev_i,
                a_end: mi,
                b_start: prev_j,
                b_end: mj,
            });
        }
        if mi < n && mj < m {
            ops.push(Opcode {
                op: Op::Equal,
                a_start: mi,
                a_end: mi + 1,
                b_start: mj,
                b_end: mj + 1,
            });
        }
        prev_i = mi + 1;
        prev_j = mj + 1;
    }
    ops
}

/// Two edits conflict iff their base line ranges overlap.
pub fn overlaps(a: &Edit, b: &Edit) -> bool {
    a.start < b.end && b.start < a.end
}
