//! 端末表示用の整形
//!
//! 文字列を返すだけで出力はしない（呼び出し側で println!）。

use vibewriting_common::{BlockKind, DiffBlock, FileRecord, Hunk, HunkKind};

/// 1ファイルのグループ一覧
pub fn file_summary(record: &FileRecord) -> String {
    let mut out = String::new();
    let heading = if record.title.is_empty() {
        record.name.clone()
    } else {
        format!("{} - {}", record.name, record.title)
    };
    out.push_str(&format!("📄 {}\n", heading));

    if let Some(error) = &record.error {
        out.push_str(&format!("  ⚠ {}\n", error));
        return out;
    }
    if record.groups.is_empty() {
        out.push_str("  (ハイライトなし)\n");
        return out;
    }

    for group in &record.groups {
        out.push_str(&format!("  p.{} [{}件]", group.page, group.count));
        if group.has_comments() {
            out.push_str(&format!(" 💬 {}", group.contents.join(" / ")));
        }
        out.push('\n');
        if !group.text.is_empty() {
            out.push_str(&format!("    {}\n", group.text));
        }
    }
    out
}

/// 文字単位の差分を1行に埋め込む: `[-削除-]{+挿入+}`
pub fn inline_changes(hunks: &[Hunk<char>]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        let text = hunk.text();
        match hunk.kind {
            HunkKind::Equal => out.push_str(&text),
            HunkKind::Delete => out.push_str(&format!("[-{}-]", text)),
            HunkKind::Insert => out.push_str(&format!("{{+{}+}}", text)),
        }
    }
    out
}

pub fn block(block: &DiffBlock, accepted: bool) -> String {
    let mark = if accepted { "✔" } else { "✘" };
    let kind = match block.kind {
        BlockKind::Paired => "変更",
        BlockKind::Delete => "削除",
        BlockKind::Insert => "追加",
    };

    let mut out = format!("{} #{} {}\n", mark, block.index, kind);
    for line in &block.deleted {
        out.push_str(&format!("  - {}\n", line));
    }
    for line in &block.inserted {
        out.push_str(&format!("  + {}\n", line));
    }
    if let Some(refined) = block.refine() {
        for line in inline_changes(&refined).split('\n') {
            out.push_str(&format!("  ~ {}\n", line));
        }
    }
    out
}

/// 行差分を unified 風に表示（一致行は先頭2文字が空白）
pub fn line_diff(hunks: &[Hunk<String>]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        let prefix = match hunk.kind {
            HunkKind::Equal => ' ',
            HunkKind::Delete => '-',
            HunkKind::Insert => '+',
        };
        for line in &hunk.items {
            out.push_str(&format!("{} {}\n", prefix, line));
        }
    }
    out
}
