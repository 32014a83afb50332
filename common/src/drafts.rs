//! 下書きタブの管理
//!
//! 常に1つ以上の下書きがあり、そのうち1つがアクティブ。
//! 各下書きは自分の undo/redo 履歴を持つ。

use crate::error::{Error, Result};
use crate::history::History;
use crate::merge::Review;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDocument {
    pub id: u32,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
struct Slot {
    doc: DraftDocument,
    history: History,
}

#[derive(Debug, Clone)]
pub struct DraftSet {
    slots: Vec<Slot>,
    active: usize,
    next_id: u32,
}

impl Default for DraftSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftSet {
    /// Starts with a single empty draft.
    pub fn new() -> Self {
        let mut set = Self {
            slots: Vec::new(),
            active: 0,
            next_id: 1,
        };
        set.create();
        set
    }

    /// Opens a new empty draft titled `Draft N` and makes it active.
    pub fn create(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.push(Slot {
            doc: DraftDocument {
                id,
                title: format!("Draft {}", id),
                content: String::new(),
            },
            history: History::new(),
        });
        self.active = self.slots.len() - 1;
        id
    }

    fn position(&self, id: u32) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.doc.id == id)
            .ok_or(Error::UnknownDraft(id))
    }

    pub fn drafts(&self) -> impl Iterator<Item = &DraftDocument> {
        self.slots.iter().map(|s| &s.doc)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&DraftDocument> {
        self.slots.iter().find(|s| s.doc.id == id).map(|s| &s.doc)
    }

    pub fn active(&self) -> &DraftDocument {
        &self.slots[self.active].doc
    }

    pub fn switch(&mut self, id: u32) -> Result<()> {
        self.active = self.position(id)?;
        Ok(())
    }

    /// Renames a draft. Blank titles are ignored and return `Ok(false)`.
    pub fn rename(&mut self, id: u32, title: &str) -> Result<bool> {
        let pos = self.position(id)?;
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        self.slots[pos].doc.title = title.to_string();
        Ok(true)
    }

    /// Closes a draft. Closing the last one opens a fresh empty draft.
    pub fn close(&mut self, id: u32) -> Result<()> {
        let pos = self.position(id)?;
        self.slots.remove(pos);

        if self.slots.is_empty() {
            self.create();
        } else if pos < self.active {
            self.active -= 1;
        } else if self.active >= self.slots.len() {
            self.active = self.slots.len() - 1;
        }
        Ok(())
    }

    /// Direct edit of the active draft. Unchanged content records nothing.
    pub fn edit(&mut self, content: String) {
        let slot = &mut self.slots[self.active];
        if slot.doc.content == content {
            return;
        }
        let previous = std::mem::replace(&mut slot.doc.content, content);
        slot.history.record(previous);
    }

    pub fn undo(&mut self) -> bool {
        let slot = &mut self.slots[self.active];
        match slot.history.undo(&slot.doc.content) {
            Some(previous) => {
                slot.doc.content = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let slot = &mut self.slots[self.active];
        match slot.history.redo(&slot.doc.content) {
            Some(next) => {
                slot.doc.content = next;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.slots[self.active].history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.slots[self.active].history.can_redo()
    }

    /// Writes the review's preview into its draft as one undoable change.
    ///
    /// Fails with [`Error::DraftChanged`] when the draft no longer holds the
    /// text the proposal was computed against.
    pub fn commit_review(&mut self, review: &Review) -> Result<()> {
        let pos = self.position(review.draft_id())?;
        let slot = &mut self.slots[pos];
        if slot.doc.content != review.base() {
            return Err(Error::DraftChanged(review.draft_id()));
        }

        let merged = review.preview();
        if merged != slot.doc.content {
            let previous = std::mem::replace(&mut slot.doc.content, merged);
            slot.history.record(previous);
        }
        tracing::info!(
            draft = review.draft_id(),
            accepted = review.accepted_count(),
            blocks = review.blocks().len(),
            "review committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{DraftOpProposal, DraftOperation};

    #[test]
    fn test_new_set_has_one_draft() {
        let drafts = DraftSet::new();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts.active().title, "Draft 1");
        assert_eq!(drafts.active().content, "");
    }

    #[test]
    fn test_create_and_switch() {
        let mut drafts = DraftSet::new();
        let second = drafts.create();
        assert_eq!(second, 2);
        assert_eq!(drafts.active().id, 2);

        drafts.switch(1).unwrap();
        assert_eq!(drafts.active().id, 1);
        assert!(matches!(drafts.switch(42), Err(Error::UnknownDraft(42))));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut drafts = DraftSet::new();
        drafts.close(1).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts.active().id, 2);
        assert_eq!(drafts.active().title, "Draft 2");
    }

    #[test]
    fn test_rename() {
        let mut drafts = DraftSet::new();
        assert!(drafts.rename(1, "  Essay  ").unwrap());
        assert_eq!(drafts.active().title, "Essay");
        assert!(!drafts.rename(1, "   ").unwrap());
        assert_eq!(drafts.active().title, "Essay");
    }

    #[test]
    fn test_close_keeps_active_valid() {
        let mut drafts = DraftSet::new();
        drafts.create();
        drafts.create(); // active = 3
        drafts.close(3).unwrap();
        assert_eq!(drafts.active().id, 2);

        drafts.switch(2).unwrap();
        drafts.close(1).unwrap();
        assert_eq!(drafts.active().id, 2);
        let ids: Vec<u32> = drafts.drafts().map(|d| d.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_edit_undo_redo() {
        let mut drafts = DraftSet::new();
        drafts.edit("one".into());
        drafts.edit("two".into());
        drafts.edit("two".into());

        assert!(drafts.undo());
        assert_eq!(drafts.active().content, "one");
        assert!(drafts.redo());
        assert_eq!(drafts.active().content, "two");

        drafts.undo();
        drafts.edit("three".into());
        assert!(!drafts.can_redo());
        assert!(!drafts.redo());
    }

    #[test]
    fn test_history_is_per_draft() {
        let mut drafts = DraftSet::new();
        drafts.edit("first draft".into());
        drafts.create();
        assert!(!drafts.can_undo());
        drafts.switch(1).unwrap();
        assert!(drafts.can_undo());
    }

    #[test]
    fn test_commit_review() {
        let mut drafts = DraftSet::new();
        drafts.edit("line1\nline2\nline3".into());

        let proposal = DraftOpProposal {
            operations: vec![DraftOperation::Patch {
                find: "line2".into(),
                replace: "lineX".into(),
                count: 1,
            }
            .into()],
            notes: None,
        };
        let review = Review::new(1, &drafts.active().content, &proposal);
        drafts.commit_review(&review).unwrap();
        assert_eq!(drafts.active().content, "line1\nlineX\nline3");

        assert!(drafts.undo());
        assert_eq!(drafts.active().content, "line1\nline2\nline3");
    }

    #[test]
    fn test_commit_fails_when_draft_changed() {
        let mut drafts = DraftSet::new();
        drafts.edit("base".into());
        let review = Review::from_texts(1, "base", "proposed", None);

        drafts.edit("edited meanwhile".into());
        let result = drafts.commit_review(&review);
        assert!(matches!(result, Err(Error::DraftChanged(1))));
        assert_eq!(drafts.active().content, "edited meanwhile");
    }

    #[test]
    fn test_commit_all_rejected_changes_nothing() {
        let mut drafts = DraftSet::new();
        drafts.edit("keep".into());
        let mut review = Review::from_texts(1, "keep", "other", None);
        review.reject_all();
        drafts.commit_review(&review).unwrap();
        assert_eq!(drafts.active().content, "keep");
        assert!(drafts.undo());
        assert_eq!(drafts.active().content, "");
    }
}
