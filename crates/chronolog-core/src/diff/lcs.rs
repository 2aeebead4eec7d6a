//! Shared LCS-to-opcodes reduction used by both the line and word diff
//! engines. Classic dynamic-programming LCS, Python-`difflib`-style
//! opcodes (equal/replace/delete/insert).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Equal,
    Replace,
    Delete,
    Insert,
}

pub(crate) struct Opcode {
    pub op: Op,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

pub(crate) fn opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
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
