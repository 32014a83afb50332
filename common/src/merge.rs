//! ブロック単位の採用・却下と本文の再構成
//!
//! 差分ハンク列を「ブロック」（削除+挿入のペア、単独の削除、単独の挿入）に
//! 分け、ブロックごとの採否から最終テキストを組み立てる。一致部分はブロック
//! ではなく常にそのまま出力する。

use crate::apply::apply_operations;
use crate::diff::{diff_lines, refine_pair, Hunk, HunkKind};
use crate::ops::DraftOpProposal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A delete hunk immediately followed by an insert hunk.
    Paired,
    Delete,
    Insert,
}

/// One independently decidable unit of change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBlock {
    pub index: usize,
    pub kind: BlockKind,
    /// Original lines (empty for a pure insert).
    pub deleted: Vec<String>,
    /// Proposed lines (empty for a pure delete).
    pub inserted: Vec<String>,
}

impl DiffBlock {
    /// Character diff for paired blocks small enough to refine.
    pub fn refine(&self) -> Option<Vec<Hunk<char>>> {
        match self.kind {
            BlockKind::Paired => refine_pair(&self.deleted, &self.inserted),
            _ => None,
        }
    }
}

enum Segment<'a> {
    Equal(&'a [String]),
    Block {
        kind: BlockKind,
        deleted: &'a [String],
        inserted: &'a [String],
    },
}

fn segments(hunks: &[Hunk<String>]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < hunks.len() {
        let hunk = &hunks[i];
        match hunk.kind {
            HunkKind::Equal => out.push(Segment::Equal(&hunk.items)),
            HunkKind::Delete => match hunks.get(i + 1) {
                Some(next) if next.kind == HunkKind::Insert => {
                    out.push(Segment::Block {
                        kind: BlockKind::Paired,
                        deleted: &hunk.items,
                        inserted: &next.items,
                    });
                    i += 1;
                }
                _ => out.push(Segment::Block {
                    kind: BlockKind::Delete,
                    deleted: &hunk.items,
                    inserted: &[],
                }),
            },
            HunkKind::Insert => out.push(Segment::Block {
                kind: BlockKind::Insert,
                deleted: &[],
                inserted: &hunk.items,
            }),
        }
        i += 1;
    }
    out
}

/// Blocks of a line diff, numbered in order from 0.
pub fn blocks(hunks: &[Hunk<String>]) -> Vec<DiffBlock> {
    segments(hunks)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Equal(_) => None,
            Segment::Block { kind, deleted, inserted } => Some((kind, deleted, inserted)),
        })
        .enumerate()
        .map(|(index, (kind, deleted, inserted))| DiffBlock {
            index,
            kind,
            deleted: deleted.to_vec(),
            inserted: inserted.to_vec(),
        })
        .collect()
}

/// Per-block decisions. Every block starts accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decisions {
    rejected: BTreeSet<usize>,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_accepted(&self, index: usize) -> bool {
        !self.rejected.contains(&index)
    }

    pub fn set(&mut self, index: usize, accepted: bool) {
        if accepted {
            self.rejected.remove(&index);
        } else {
            self.rejected.insert(index);
        }
    }

    pub fn toggle(&mut self, index: usize) {
        let accepted = self.is_accepted(index);
        self.set(index, !accepted);
    }

    pub fn accept_all(&mut self) {
        self.rejected.clear();
    }

    pub fn reject_all(&mut self, block_count: usize) {
        self.rejected = (0..block_count).collect();
    }
}

/// Walks the hunks and emits equal lines plus each block's chosen side.
pub fn reconstruct(hunks: &[Hunk<String>], decisions: &Decisions) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut index = 0;
    for segment in segments(hunks) {
        match segment {
            Segment::Equal(items) => lines.extend(items.iter().map(String::as_str)),
            Segment::Block { deleted, inserted, .. } => {
                let chosen = if decisions.is_accepted(index) { inserted } else { deleted };
                lines.extend(chosen.iter().map(String::as_str));
                index += 1;
            }
        }
    }
    lines.join("\n")
}

/// A proposal under review against one draft.
#[derive(Debug, Clone)]
pub struct Review {
    draft_id: u32,
    base: String,
    proposed: String,
    hunks: Vec<Hunk<String>>,
    blocks: Vec<DiffBlock>,
    decisions: Decisions,
    notes: Option<String>,
}

impl Review {
    /// Applies the proposal to `base` and diffs the result.
    pub fn new(draft_id: u32, base: &str, proposal: &DraftOpProposal) -> Self {
        let proposed = apply_operations(base, &proposal.operations);
        Self::from_texts(draft_id, base, &proposed, proposal.notes.clone())
    }

    pub fn from_texts(draft_id: u32, base: &str, proposed: &str, notes: Option<String>) -> Self {
        let hunks = diff_lines(base, proposed);
        let blocks = blocks(&hunks);
        tracing::debug!(draft_id, blocks = blocks.len(), "review prepared");
        Self {
            draft_id,
            base: base.to_string(),
            proposed: proposed.to_string(),
            hunks,
            blocks,
            decisions: Decisions::new(),
            notes,
        }
    }

    pub fn draft_id(&self) -> u32 {
        self.draft_id
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn proposed(&self) -> &str {
        &self.proposed
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn hunks(&self) -> &[Hunk<String>] {
        &self.hunks
    }

    pub fn blocks(&self) -> &[DiffBlock] {
        &self.blocks
    }

    /// True when the proposal changes nothing.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_accepted(&self, index: usize) -> bool {
        self.decisions.is_accepted(index)
    }

    pub fn accepted_count(&self) -> usize {
        (0..self.blocks.len()).filter(|&i| self.decisions.is_accepted(i)).count()
    }

    /// Returns false for an out-of-range block index.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.blocks.len() {
            return false;
        }
        self.decisions.toggle(index);
        true
    }

    pub fn accept(&mut self, index: usize) -> bool {
        self.decide(index, true)
    }

    pub fn reject(&mut self, index: usize) -> bool {
        self.decide(index, false)
    }

    fn decide(&mut self, index: usize, accepted: bool) -> bool {
        if index >= self.blocks.len() {
            return false;
        }
        self.decisions.set(index, accepted);
        true
    }

    pub fn accept_all(&mut self) {
        self.decisions.accept_all();
    }

    pub fn reject_all(&mut self) {
        self.decisions.reject_all(self.blocks.len());
    }

    /// Text that committing the review would produce.
    pub fn preview(&self) -> String {
        reconstruct(&self.hunks, &self.decisions)
    }
}
