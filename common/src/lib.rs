//! VibeWriting Common Library
//!
//! PDFハイライト抽出と下書き編集のコアロジック（I/Oなし）

pub mod apply;
pub mod diff;
pub mod drafts;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod grouper;
pub mod history;
pub mod library;
pub mod merge;
pub mod ops;
pub mod parser;
pub mod prompts;
pub mod types;

pub use apply::apply_operations;
pub use diff::{diff_chars, diff_lines, diff_tokens, refine_pair, Hunk, HunkKind};
pub use drafts::{DraftDocument, DraftSet};
pub use error::{Error, Result};
pub use extractor::extract_page_notes;
pub use geometry::{Matrix, Rect, Viewport};
pub use grouper::{group_notes, PROXIMITY_THRESHOLD};
pub use history::History;
pub use library::{FileLibrary, SourcedGroup};
pub use merge::{blocks, reconstruct, BlockKind, Decisions, DiffBlock, Review};
pub use ops::{DraftOpProposal, DraftOperation, OperationEntry};
pub use parser::{extract_json, parse_reply, ParsedReply};
pub use prompts::{build_system_prompt, DEFAULT_SYSTEM_PROMPT};
pub use types::{Annotation, ExtractedNote, FileRecord, HighlightGroup, PageContent, Rgb, Subtype, TextItem};
