//! アシスタント応答パーサー
//!
//! 応答テキストから編集提案（`{"operations": [...], "notes": "..."}`）を取り出す。
//! 提案が読み取れない応答はエラーではなく「提案なし」として扱う。

use crate::ops::{DraftOpProposal, OperationEntry};
use regex::Regex;
use serde_json::Value;

/// Outcome of reading one assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// The reply is conversation only.
    NoProposal,
    Proposal(DraftOpProposal),
}

impl ParsedReply {
    pub fn proposal(&self) -> Option<&DraftOpProposal> {
        match self {
            ParsedReply::Proposal(p) => Some(p),
            ParsedReply::NoProposal => None,
        }
    }
}

/// 応答からJSON候補部分を抽出
///
/// 抽出優先順位:
/// 1. 最初の ```json ... ``` ブロック（ラベルは大文字小文字を区別しない）
/// 2. 応答全体
///
/// # Examples
/// ```
/// use vibewriting_common::extract_json;
///
/// let reply = "Sure.\n```JSON\n{\"operations\": []}\n```\nDone.";
/// assert_eq!(extract_json(reply), "{\"operations\": []}");
/// assert_eq!(extract_json("  {}  "), "{}");
/// ```
pub fn extract_json(reply: &str) -> &str {
    lazy_static::lazy_static! {
        static ref FENCED_JSON: Regex = Regex::new(r"(?is)```\s*json\s*(.*?)```").unwrap();
    }

    match FENCED_JSON.captures(reply).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => reply.trim(),
    }
}

/// 応答をパース
///
/// - JSONとして読めない、またはオブジェクトでない → `NoProposal`
/// - `operations` が配列でない → 空の操作列
/// - `notes` は文字列のときだけ採用
pub fn parse_reply(reply: &str) -> ParsedReply {
    let candidate = extract_json(reply);
    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("reply carries no JSON proposal: {}", e);
            return ParsedReply::NoProposal;
        }
    };

    let Value::Object(mut object) = value else {
        return ParsedReply::NoProposal;
    };

    let operations = match object.remove("operations") {
        Some(Value::Array(entries)) => entries.into_iter().map(OperationEntry::from_value).collect(),
        _ => Vec::new(),
    };
    let notes = match object.remove("notes") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };

    ParsedReply::Proposal(DraftOpProposal { operations, notes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::DraftOperation;
    use serde_json::json;

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let reply = r#"Here is my edit:
```json
{"operations": [{"type": "set_title", "text": "New"}]}
```
Let me know."#;
        assert_eq!(
            extract_json(reply),
            r#"{"operations": [{"type": "set_title", "text": "New"}]}"#
        );
    }

    #[test]
    fn test_extract_json_first_block_wins() {
        let reply = "```json\n{\"a\": 1}\n```\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json(reply), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_without_block() {
        assert_eq!(extract_json("\n {\"operations\": []} \n"), "{\"operations\": []}");
    }

    // =============================================
    // parse_reply テスト
    // =============================================

    #[test]
    fn test_parse_reply_plain_text() {
        assert_eq!(parse_reply("I think the intro is fine as is."), ParsedReply::NoProposal);
        assert_eq!(parse_reply(""), ParsedReply::NoProposal);
    }

    #[test]
    fn test_parse_reply_non_object_json() {
        assert_eq!(parse_reply("[1, 2, 3]"), ParsedReply::NoProposal);
        assert_eq!(parse_reply("```json\n\"just a string\"\n```"), ParsedReply::NoProposal);
    }

    #[test]
    fn test_parse_reply_broken_block() {
        assert_eq!(parse_reply("```json\n{\"operations\": [\n```"), ParsedReply::NoProposal);
    }

    #[test]
    fn test_parse_reply_proposal() {
        let reply = r#"```json
{"operations": [
  {"type": "patch", "find": "teh", "replace": "the", "count": 2},
  {"type": "explode"}
], "notes": "fixed typos"}
```"#;
        let ParsedReply::Proposal(proposal) = parse_reply(reply) else {
            panic!("expected a proposal");
        };
        assert_eq!(proposal.operations.len(), 2);
        assert_eq!(
            proposal.operations[0],
            OperationEntry::Known(DraftOperation::Patch {
                find: "teh".into(),
                replace: "the".into(),
                count: 2
            })
        );
        assert_eq!(proposal.operations[1], OperationEntry::Unrecognized(json!({"type": "explode"})));
        assert_eq!(proposal.notes.as_deref(), Some("fixed typos"));
    }

    #[test]
    fn test_parse_reply_lenient_fields() {
        let reply = r#"{"operations": "not a list", "notes": 5}"#;
        assert_eq!(
            parse_reply(reply),
            ParsedReply::Proposal(DraftOpProposal { operations: vec![], notes: None })
        );

        let reply = r#"{"notes": "nothing to change"}"#;
        let parsed = parse_reply(reply);
        let proposal = parsed.proposal().unwrap();
        assert!(proposal.operations.is_empty());
        assert_eq!(proposal.notes.as_deref(), Some("nothing to change"));
    }
}
