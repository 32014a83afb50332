//! 編集操作の適用
//!
//! 操作は順番に、直前までの結果に対して適用する。適用できない操作は
//! 警告ログを出してスキップし、全体を失敗させない。

use crate::ops::{DraftOperation, OperationEntry};
use regex::Regex;

/// Applies all entries in order and returns the proposed text.
///
/// ```
/// use vibewriting_common::{apply_operations, DraftOperation};
///
/// let ops = vec![DraftOperation::SetTitle { text: "Notes".into() }.into()];
/// assert_eq!(apply_operations("body", &ops), "# Notes\n\nbody");
/// ```
pub fn apply_operations(text: &str, operations: &[OperationEntry]) -> String {
    let mut current = text.to_string();
    for (index, entry) in operations.iter().enumerate() {
        match entry {
            OperationEntry::Known(op) => current = apply_operation(&current, op),
            OperationEntry::Unrecognized(value) => {
                tracing::warn!(index, operation = %value, "skipping unrecognized draft operation");
            }
        }
    }
    current
}

/// Applies a single operation.
pub fn apply_operation(text: &str, op: &DraftOperation) -> String {
    match op {
        DraftOperation::ReplaceAll { text: replacement } => replacement.clone(),
        DraftOperation::AppendSection { heading, text: body } => {
            format!("{}\n\n## {}\n\n{}", text, heading, body)
        }
        DraftOperation::Patch { find, replace, count } => patch(text, find, replace, *count),
        DraftOperation::SetTitle { text: title } => set_title(text, title),
        DraftOperation::ReplaceRange { start, end, text: insert } => {
            replace_range(text, *start, *end, insert)
        }
    }
}

fn patch(text: &str, find: &str, replace: &str, count: i64) -> String {
    if find.is_empty() {
        tracing::warn!("skipping patch with empty find string");
        return text.to_string();
    }
    let limit = usize::try_from(count.max(1)).unwrap_or(usize::MAX);
    text.replacen(find, replace, limit)
}

fn set_title(text: &str, title: &str) -> String {
    lazy_static::lazy_static! {
        static ref HEADING_PREFIX: Regex = Regex::new(r"^\s*#\s+").unwrap();
    }

    // 1行目だけを見る（\r\n の \r は行末側に残す）
    let line_end = text.find('\n').unwrap_or(text.len());
    let first = text[..line_end].trim_end_matches('\r');
    let rest = &text[first.len()..];

    match HEADING_PREFIX.find(first) {
        Some(prefix) => format!("{}{}{}", prefix.as_str(), title, rest),
        None => format!("# {}\n\n{}", title, text),
    }
}

fn replace_range(text: &str, start: i64, end: i64, insert: &str) -> String {
    let len = text.chars().count() as i64;
    let start = start.max(0);
    let end = end.max(start);
    if start > len || end == start {
        return text.to_string();
    }
    let end = end.min(len);

    let byte_at = |offset: i64| {
        text.char_indices()
            .nth(offset as usize)
            .map(|(b, _)| b)
            .unwrap_or(text.len())
    };
    let (from, to) = (byte_at(start), byte_at(end));

    let mut out = String::with_capacity(text.len() - (to - from) + insert.len());
    out.push_str(&text[..from]);
    out.push_str(insert);
    out.push_str(&text[to..]);
    out
}
