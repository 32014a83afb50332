//! 読み込み済みファイルの管理
//!
//! パスをキーにしたファイル一覧。同じパスを再度読み込んだ場合は上書きせず
//! ノートをマージし、グループはマージ後のノートから作り直す。

use crate::grouper::group_notes;
use crate::types::{FileRecord, HighlightGroup};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Merges a re-import of the same path into `existing`.
///
/// The existing title wins unless it is empty. Notes are unioned by
/// [`ExtractedNote::dedup_key`](crate::types::ExtractedNote::dedup_key),
/// keeping existing order and appending new notes. Groups are regenerated
/// from the merged notes; `error` reflects the latest import.
pub fn merge_record(existing: &mut FileRecord, incoming: FileRecord) {
    if existing.title.is_empty() {
        existing.title = incoming.title;
    }

    let mut seen: HashSet<String> = existing.notes.iter().map(|n| n.dedup_key()).collect();
    let before = existing.notes.len();
    for note in incoming.notes {
        if seen.insert(note.dedup_key()) {
            existing.notes.push(note);
        }
    }
    tracing::debug!(
        path = %existing.path,
        added = existing.notes.len() - before,
        "merged re-imported notes"
    );

    existing.groups = group_notes(&existing.notes);
    existing.error = incoming.error;
}

/// Session-wide collection of imported files, indexed by path.
#[derive(Debug, Clone, Default)]
pub struct FileLibrary {
    records: Vec<FileRecord>,
    index: HashMap<String, usize>,
    selected: BTreeSet<usize>,
}

/// A group tagged with the file it came from.
#[derive(Debug, Clone, Copy)]
pub struct SourcedGroup<'a> {
    pub file: &'a FileRecord,
    pub group: &'a HighlightGroup,
}

impl FileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of extraction results, merging paths already held.
    ///
    /// The first file ever imported becomes selected.
    pub fn absorb(&mut self, records: Vec<FileRecord>) {
        let was_empty = self.records.is_empty();
        for record in records {
            match self.index.get(&record.path) {
                Some(&i) => merge_record(&mut self.records[i], record),
                None => {
                    self.index.insert(record.path.clone(), self.records.len());
                    self.records.push(record);
                }
            }
        }
        if was_empty && !self.records.is_empty() {
            self.selected.insert(0);
        }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.index.get(path).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Selects exactly one file by position.
    pub fn select_only(&mut self, position: usize) -> bool {
        if position >= self.records.len() {
            return false;
        }
        self.selected.clear();
        self.selected.insert(position);
        true
    }

    /// Adds or removes a file from the selection.
    pub fn toggle(&mut self, position: usize) -> bool {
        if position >= self.records.len() {
            return false;
        }
        if !self.selected.remove(&position) {
            self.selected.insert(position);
        }
        true
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.selected.contains(&position)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Groups of all selected files, in file order then group order.
    pub fn selected_groups(&self) -> Vec<SourcedGroup<'_>> {
        self.selected
            .iter()
            .map(|&i| &self.records[i])
            .flat_map(|file| file.groups.iter().map(move |group| SourcedGroup { file, group }))
            .collect()
    }

    /// Highlight context handed to the assistant, one block per group.
    pub fn context_block(&self) -> String {
        self.selected_groups()
            .iter()
            .map(|g| {
                format!(
                    "File: {} (page {})\nComments: {}\nText: {}",
                    g.file.name,
                    g.group.page,
                    g.group.contents.join(" / "),
                    g.group.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractedNote, Subtype};

    fn note(page: u32, min_y: f64, contents: &str, text: &str) -> ExtractedNote {
        ExtractedNote {
            page,
            subtype: Subtype::Highlight,
            contents: contents.to_string(),
            text: text.to_string(),
            min_y,
            max_y: min_y + 10.0,
            color: None,
        }
    }

    fn record(path: &str, title: &str, notes: Vec<ExtractedNote>) -> FileRecord {
        let groups = group_notes(&notes);
        FileRecord {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            title: title.to_string(),
            notes,
            groups,
            error: None,
        }
    }

    #[test]
    fn test_reimport_adds_only_new_notes() {
        let original = vec![note(1, 0.0, "", "alpha"), note(2, 0.0, "c", "beta")];
        let mut library = FileLibrary::new();
        library.absorb(vec![record("/docs/a.pdf", "A", original.clone())]);

        let mut again = original.clone();
        again.push(note(3, 0.0, "", "gamma"));
        library.absorb(vec![record("/docs/a.pdf", "A", again)]);

        let merged = library.get("/docs/a.pdf").unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(merged.notes.len(), original.len() + 1);
        let keys: HashSet<String> = merged.notes.iter().map(|n| n.dedup_key()).collect();
        assert_eq!(keys.len(), merged.notes.len());
        assert_eq!(merged.notes[2].text, "gamma");
    }

    #[test]
    fn test_groups_regenerated_after_merge() {
        let mut existing = record("/a.pdf", "", vec![note(1, 0.0, "", "one")]);
        let incoming = record("/a.pdf", "", vec![note(1, 12.0, "", "two"), note(4, 0.0, "", "far")]);
        merge_record(&mut existing, incoming);

        assert_eq!(existing.groups, group_notes(&existing.notes));
        assert_eq!(existing.groups.len(), 2);
        assert_eq!(existing.groups[0].text, "one two");
    }

    #[test]
    fn test_title_existing_wins_when_present() {
        let mut existing = record("/a.pdf", "Kept", vec![]);
        merge_record(&mut existing, record("/a.pdf", "Other", vec![]));
        assert_eq!(existing.title, "Kept");

        let mut untitled = record("/b.pdf", "", vec![]);
        merge_record(&mut untitled, record("/b.pdf", "Found", vec![]));
        assert_eq!(untitled.title, "Found");
    }

    #[test]
    fn test_duplicates_within_incoming_are_dropped() {
        let mut existing = record("/a.pdf", "", vec![]);
        let incoming = record("/a.pdf", "", vec![note(1, 0.0, "", "x"), note(1, 50.0, "", "x")]);
        merge_record(&mut existing, incoming);
        assert_eq!(existing.notes.len(), 1);
    }

    #[test]
    fn test_error_reflects_latest_import() {
        let mut existing = FileRecord::failed("/a.pdf", "a.pdf", "locked");
        merge_record(&mut existing, record("/a.pdf", "T", vec![note(1, 0.0, "", "x")]));
        assert_eq!(existing.error, None);
        assert_eq!(existing.notes.len(), 1);
    }

    #[test]
    fn test_absorb_keeps_input_order_and_selects_first() {
        let mut library = FileLibrary::new();
        library.absorb(vec![record("/b.pdf", "", vec![]), record("/a.pdf", "", vec![])]);
        let paths: Vec<&str> = library.records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/b.pdf", "/a.pdf"]);
        assert!(library.is_selected(0));
        assert!(!library.is_selected(1));

        library.absorb(vec![record("/c.pdf", "", vec![])]);
        assert_eq!(library.selected_count(), 1);
    }

    #[test]
    fn test_selection_and_context() {
        let mut library = FileLibrary::new();
        library.absorb(vec![
            record("/a.pdf", "", vec![note(1, 0.0, "note", "first")]),
            record("/b.pdf", "", vec![note(2, 0.0, "", "second")]),
        ]);

        assert!(library.toggle(1));
        assert_eq!(library.selected_groups().len(), 2);

        let context = library.context_block();
        assert!(context.contains("File: a.pdf (page 1)\nComments: note\nText: first"));
        assert!(context.contains("File: b.pdf (page 2)"));

        assert!(library.select_only(1));
        assert_eq!(library.selected_groups().len(), 1);
        assert!(!library.select_only(9));
        assert!(!library.toggle(9));
    }
}
