//! プロンプト生成モジュール
//!
//! - DEFAULT_SYSTEM_PROMPT: 設定ファイルで上書きされない場合の既定プロンプト
//! - build_system_prompt: 既定プロンプト + 現在の下書き + ハイライト文脈

/// Built-in system prompt. Documents the edit-proposal protocol.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a writing assistant. The user is writing a document based on highlighted passages from PDF files.
Help them with suggestions, summaries and expansions grounded in those highlights.

When you want to change the draft, include exactly one fenced JSON block:

```json
{
  "operations": [
    {"type": "replace_all", "text": "full new draft"},
    {"type": "append_section", "heading": "Heading", "text": "section body"},
    {"type": "patch", "find": "exact existing text", "replace": "new text", "count": 1},
    {"type": "set_title", "text": "Document title"},
    {"type": "replace_range", "start": 0, "end": 10, "text": "new text"}
  ],
  "notes": "one-line summary of the change"
}
```

Operations are applied in order, each to the result of the previous one.
`replace_range` offsets count characters. Use only the operations you need.
If no change to the draft is needed, answer in plain text without a JSON block."#;

/// システムプロンプトを組み立てる
///
/// # Arguments
/// * `base` - 既定または設定ファイルのプロンプト
/// * `draft` - アクティブな下書きの本文
/// * `context` - 選択中ファイルのハイライト文脈（空なら省略）
pub fn build_system_prompt(base: &str, draft: &str, context: &str) -> String {
    let mut prompt = base.trim_end().to_string();

    if !context.trim().is_empty() {
        prompt.push_str("\n\n## Highlights selected by the user\n\n");
        prompt.push_str(context);
    }

    prompt.push_str("\n\n## Current draft\n\n");
    if draft.is_empty() {
        prompt.push_str("(empty)");
    } else {
        prompt.push_str(draft);
    }
    prompt
}
