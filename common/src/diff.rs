//! 行単位・文字単位の差分
//!
//! 接尾辞に対するLCSテーブルで最小編集列を求める。一致しない位置では
//! LCS長が保てる限り削除を挿入より先に出す。同種の隣接ハンクは結合する。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HunkKind {
    Equal,
    Delete,
    Insert,
}

/// A maximal run of tokens with the same edit kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk<T> {
    pub kind: HunkKind,
    pub items: Vec<T>,
}

impl Hunk<char> {
    pub fn text(&self) -> String {
        self.items.iter().collect()
    }
}

/// Minimal edit script turning `before` into `after`.
pub fn diff_tokens<T: PartialEq + Clone>(before: &[T], after: &[T]) -> Vec<Hunk<T>> {
    let (n, m) = (before.len(), after.len());
    let width = m + 1;

    // lcs[i * width + j] = LCS length of before[i..] and after[j..]
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if before[i] == after[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut hunks: Vec<Hunk<T>> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && before[i] == after[j] {
            push(&mut hunks, HunkKind::Equal, &before[i]);
            i += 1;
            j += 1;
        } else if i < n && (j == m || lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            push(&mut hunks, HunkKind::Delete, &before[i]);
            i += 1;
        } else {
            push(&mut hunks, HunkKind::Insert, &after[j]);
            j += 1;
        }
    }
    hunks
}

fn push<T: Clone>(hunks: &mut Vec<Hunk<T>>, kind: HunkKind, item: &T) {
    match hunks.last_mut() {
        Some(last) if last.kind == kind => last.items.push(item.clone()),
        _ => hunks.push(Hunk {
            kind,
            items: vec![item.clone()],
        }),
    }
}

/// Line diff. Lines are split on `'\n'` only, so joining the kept lines
/// with `'\n'` reproduces either side byte for byte.
pub fn diff_lines(before: &str, after: &str) -> Vec<Hunk<String>> {
    let split = |s: &str| s.split('\n').map(String::from).collect::<Vec<_>>();
    diff_tokens(&split(before), &split(after))
}

pub fn diff_chars(before: &str, after: &str) -> Vec<Hunk<char>> {
    let before: Vec<char> = before.chars().collect();
    let after: Vec<char> = after.chars().collect();
    diff_tokens(&before, &after)
}

/// LCS表のセル数の上限（これを超える組は文字単位に分解しない）
pub const REFINE_CELL_LIMIT: usize = 4_000_000;

/// Character-level view of a paired delete/insert block.
///
/// Returns `None` when `before × after` characters exceed
/// [`REFINE_CELL_LIMIT`]; the block is then shown line by line only.
pub fn refine_pair(deleted: &[String], inserted: &[String]) -> Option<Vec<Hunk<char>>> {
    let (before, after) = (deleted.join("\n"), inserted.join("\n"));
    let cells = (before.chars().count() + 1).saturating_mul(after.chars().count() + 1);
    if cells > REFINE_CELL_LIMIT {
        tracing::debug!(cells, "paired block too large for a character diff");
        return None;
    }
    Some(diff_chars(&before, &after))
}

/// Rebuilds one side of a diff.
pub fn side_text(hunks: &[Hunk<String>], kind: HunkKind) -> String {
    hunks
        .iter()
        .filter(|h| h.kind == HunkKind::Equal || h.kind == kind)
        .flat_map(|h| h.items.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}
