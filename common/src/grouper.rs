//! ハイライトのグループ化
//!
//! 同じページ内で縦方向に並べ、前のグループの maxY と次のノートの minY の
//! 距離がしきい値以下なら同じ段落としてまとめる。

use crate::types::{ExtractedNote, HighlightGroup};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Maximum vertical gap (viewport units) between notes of one group,
/// roughly one line of body text.
pub const PROXIMITY_THRESHOLD: f64 = 8.0;

/// Clusters notes into reading-order groups.
///
/// Groups carrying reviewer comments come first, then by page, then by
/// vertical position.
pub fn group_notes(notes: &[ExtractedNote]) -> Vec<HighlightGroup> {
    let mut by_page: BTreeMap<u32, Vec<&ExtractedNote>> = BTreeMap::new();
    for note in notes {
        by_page.entry(note.page).or_default().push(note);
    }

    let mut groups = Vec::new();
    for (page, mut page_notes) in by_page {
        page_notes.sort_by(|a, b| a.min_y.total_cmp(&b.min_y));

        let mut current: Option<GroupBuilder> = None;
        for note in page_notes {
            match current.as_mut() {
                Some(group) if note.min_y - group.max_y <= PROXIMITY_THRESHOLD => {
                    group.push(note);
                }
                _ => {
                    if let Some(done) = current.take() {
                        groups.push(done.finish());
                    }
                    current = Some(GroupBuilder::start(page, note));
                }
            }
        }
        if let Some(done) = current {
            groups.push(done.finish());
        }
    }

    groups.sort_by(compare_groups);
    groups
}

fn compare_groups(a: &HighlightGroup, b: &HighlightGroup) -> Ordering {
    b.has_comments()
        .cmp(&a.has_comments())
        .then(a.page.cmp(&b.page))
        .then(a.min_y.total_cmp(&b.min_y))
}

struct GroupBuilder {
    page: u32,
    min_y: f64,
    max_y: f64,
    items: Vec<ExtractedNote>,
}

impl GroupBuilder {
    fn start(page: u32, note: &ExtractedNote) -> Self {
        Self {
            page,
            min_y: note.min_y,
            max_y: note.max_y,
            items: vec![note.clone()],
        }
    }

    fn push(&mut self, note: &ExtractedNote) {
        self.max_y = self.max_y.max(note.max_y);
        self.items.push(note.clone());
    }

    fn finish(self) -> HighlightGroup {
        let contents = self
            .items
            .iter()
            .filter(|n| !n.contents.is_empty())
            .map(|n| n.contents.clone())
            .collect();
        let text = self
            .items
            .iter()
            .filter(|n| !n.text.is_empty())
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        HighlightGroup {
            page: self.page,
            count: self.items.len(),
            contents,
            text,
            min_y: self.min_y,
            max_y: self.max_y,
            items: self.items,
        }
    }
}
