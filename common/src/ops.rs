//! 下書き編集操作の型定義
//!
//! アシスタントが提案する編集操作。JSONでは `"type"` フィールドで区別する:
//!
//! ```json
//! {"type": "patch", "find": "teh", "replace": "the", "count": 2}
//! ```

use serde::{Deserialize, Serialize};

fn one() -> i64 {
    1
}

/// One structured edit instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftOperation {
    /// Replace the whole draft.
    ReplaceAll { text: String },

    /// Append `## heading` and a body at the end of the draft.
    AppendSection {
        heading: String,
        #[serde(default)]
        text: String,
    },

    /// Replace up to `max(1, count)` leftmost occurrences of `find`.
    Patch {
        find: String,
        #[serde(default)]
        replace: String,
        #[serde(default = "one")]
        count: i64,
    },

    /// Set (or insert) the top-level heading on the first line.
    SetTitle { text: String },

    /// Splice `text` into the character range `[start, end)`.
    ReplaceRange {
        start: i64,
        end: i64,
        #[serde(default)]
        text: String,
    },
}

/// An entry of the `operations` array.
///
/// Entries that do not match any [`DraftOperation`] shape are kept verbatim
/// so that the applier can skip them one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationEntry {
    Known(DraftOperation),
    Unrecognized(serde_json::Value),
}

impl OperationEntry {
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<DraftOperation>(value.clone()) {
            Ok(op) => OperationEntry::Known(op),
            Err(_) => OperationEntry::Unrecognized(value),
        }
    }

    pub fn as_known(&self) -> Option<&DraftOperation> {
        match self {
            OperationEntry::Known(op) => Some(op),
            OperationEntry::Unrecognized(_) => None,
        }
    }
}

impl From<DraftOperation> for OperationEntry {
    fn from(op: DraftOperation) -> Self {
        OperationEntry::Known(op)
    }
}

/// An edit proposal extracted from an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftOpProposal {
    #[serde(default)]
    pub operations: Vec<OperationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DraftOpProposal {
    pub fn recognized_count(&self) -> usize {
        self.operations.iter().filter(|e| e.as_known().is_some()).count()
    }
}
