//! 対話式執筆セッション
//!
//! 1行入力ごとにコマンドを解釈する。`/` で始まらない入力はアシスタントへの
//! メッセージとして送り、応答に編集提案があればブロック単位でレビューする。

use crate::assistant::{load_system_prompt, Assistant, CallOutcome, ChatSession};
use crate::batch;
use crate::config::Config;
use crate::error::{Result, VibeError};
use crate::render;
use crate::scanner;
use crate::session_log::{ChatLogEntry, SessionLog};
use dialoguer::Input;
use std::path::{Path, PathBuf};
use vibewriting_common::{build_system_prompt, parse_reply, DraftSet, FileLibrary, ParsedReply, Review};

const HELP: &str = "\
コマンド:
  /add <パス...>        PDFまたはフォルダを読み込む
  /files                読み込み済みファイル一覧
  /select <番号>        そのファイルだけを選択
  /toggle <番号>        選択を切り替え
  /groups               選択中ファイルのハイライト
  /drafts               下書き一覧
  /new                  新しい下書き
  /switch <ID>          下書きを切り替え
  /rename <ID> <名前>   下書きの名前を変更
  /close <ID>           下書きを閉じる
  /show                 アクティブな下書きを表示
  /load <ファイル>      ファイルの内容で下書きを置き換え
  /save <ファイル>      下書きをファイルに保存
  /undo /redo           元に戻す / やり直し
  /clear                会話履歴を消去（下書きはそのまま）
  /help /quit
それ以外の入力はアシスタントへ送信します。";

/// セッションコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddFiles(Vec<PathBuf>),
    ListFiles,
    /// 0始まりの位置
    SelectOnly(usize),
    Toggle(usize),
    ShowGroups,
    ListDrafts,
    NewDraft,
    Switch(u32),
    Rename(u32, String),
    Close(u32),
    ShowDraft,
    LoadDraft(PathBuf),
    SaveDraft(PathBuf),
    Undo,
    Redo,
    ClearChat,
    Help,
    Quit,
    Chat(String),
    Invalid(String),
    Empty,
}

/// レビュー中の操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Toggle(usize),
    AcceptAll,
    RejectAll,
    Preview,
    Apply,
    Discard,
    Invalid,
}

/// 1行をコマンドに変換（ファイル番号は1始まりで入力）
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default().trim();

    let position = |arg: &str| match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n - 1),
        _ => None,
    };
    let id = |arg: &str| arg.parse::<u32>().ok();

    match name {
        "add" if !arg.is_empty() => Command::AddFiles(arg.split_whitespace().map(PathBuf::from).collect()),
        "files" => Command::ListFiles,
        "select" => position(arg).map(Command::SelectOnly).unwrap_or_else(|| invalid(line)),
        "toggle" => position(arg).map(Command::Toggle).unwrap_or_else(|| invalid(line)),
        "groups" => Command::ShowGroups,
        "drafts" => Command::ListDrafts,
        "new" => Command::NewDraft,
        "switch" => id(arg).map(Command::Switch).unwrap_or_else(|| invalid(line)),
        "rename" => {
            let mut split = arg.splitn(2, char::is_whitespace);
            match (split.next().and_then(id), split.next()) {
                (Some(id), Some(title)) => Command::Rename(id, title.trim().to_string()),
                _ => invalid(line),
            }
        }
        "close" => id(arg).map(Command::Close).unwrap_or_else(|| invalid(line)),
        "show" => Command::ShowDraft,
        "load" if !arg.is_empty() => Command::LoadDraft(PathBuf::from(arg)),
        "save" if !arg.is_empty() => Command::SaveDraft(PathBuf::from(arg)),
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "clear" => Command::ClearChat,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => invalid(line),
    }
}

fn invalid(line: &str) -> Command {
    Command::Invalid(line.to_string())
}

pub fn parse_review_action(line: &str) -> ReviewAction {
    match line.trim() {
        "a" => ReviewAction::AcceptAll,
        "r" => ReviewAction::RejectAll,
        "p" => ReviewAction::Preview,
        "y" => ReviewAction::Apply,
        "n" | "q" => ReviewAction::Discard,
        other => match other.parse::<usize>() {
            Ok(index) => ReviewAction::Toggle(index),
            Err(_) => ReviewAction::Invalid,
        },
    }
}

/// アシスタント1往復の結果
#[derive(Debug)]
pub struct ChatTurn {
    pub reply: String,
    /// 変更を伴う提案があればレビュー
    pub review: Option<Review>,
}

/// セッション状態（ファイル・下書き・会話）
pub struct Workspace {
    pub library: FileLibrary,
    pub drafts: DraftSet,
    chat: ChatSession,
    assistant: Box<dyn Assistant>,
    system_prompt: String,
    log: SessionLog,
}

impl Workspace {
    pub fn new(assistant: Box<dyn Assistant>, system_prompt: String, log: SessionLog) -> Self {
        Self {
            library: FileLibrary::new(),
            drafts: DraftSet::new(),
            chat: ChatSession::new(),
            assistant,
            system_prompt,
            log,
        }
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    /// パスを展開して抽出し、ライブラリに加える。読み込んだ件数を返す。
    pub async fn add_files(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let pdfs = scanner::expand_pdf_paths(paths);
        if pdfs.is_empty() {
            return Err(VibeError::NoPdfsFound(
                paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
            ));
        }

        let records = batch::extract_files(&pdfs, true).await;
        if let Err(e) = self.log.record_extraction(&records) {
            tracing::warn!("session log not written: {}", e);
        }
        let count = records.len();
        self.library.absorb(records);
        Ok(count)
    }

    /// メッセージを送り、応答を解析する。下書きは変更しない。
    pub async fn ask(&mut self, message: &str) -> Result<ChatTurn> {
        let draft = self.drafts.active();
        let (draft_id, base) = (draft.id, draft.content.clone());
        let system_prompt = build_system_prompt(&self.system_prompt, &base, &self.library.context_block());

        let result = self.chat.send(self.assistant.as_ref(), message, Some(&system_prompt)).await;

        let outcome = CallOutcome::from(result.as_ref().cloned().map_err(ToString::to_string));
        let entry = ChatLogEntry {
            backend: self.assistant.name(),
            system_prompt: Some(&system_prompt),
            messages: self.chat.history(),
            outcome: &outcome,
        };
        if let Err(e) = self.log.record_chat(&entry) {
            tracing::warn!("session log not written: {}", e);
        }

        let reply = result?.content;
        let review = match parse_reply(&reply) {
            ParsedReply::Proposal(proposal) if proposal.recognized_count() > 0 => {
                let review = Review::new(draft_id, &base, &proposal);
                (!review.is_empty()).then_some(review)
            }
            _ => None,
        };
        Ok(ChatTurn { reply, review })
    }

    pub fn commit(&mut self, review: &Review) -> Result<()> {
        self.drafts.commit_review(review)?;
        Ok(())
    }

    /// 対話を必要としないコマンドを実行し、表示用テキストを返す
    pub async fn execute(&mut self, command: Command) -> Result<String> {
        let message = match command {
            Command::AddFiles(paths) => {
                let count = self.add_files(&paths).await?;
                format!("✔ {}件のPDFを読み込みました\n{}", count, self.file_list())
            }
            Command::ListFiles => self.file_list(),
            Command::SelectOnly(position) => {
                if self.library.select_only(position) {
                    self.file_list()
                } else {
                    format!("ファイル番号が範囲外です: {}", position + 1)
                }
            }
            Command::Toggle(position) => {
                if self.library.toggle(position) {
                    self.file_list()
                } else {
                    format!("ファイル番号が範囲外です: {}", position + 1)
                }
            }
            Command::ShowGroups => {
                let context = self.library.context_block();
                if context.is_empty() {
                    "選択中のハイライトはありません".to_string()
                } else {
                    context
                }
            }
            Command::ListDrafts => self.draft_list(),
            Command::NewDraft => {
                let id = self.drafts.create();
                format!("✔ 下書き {} を作成しました", id)
            }
            Command::Switch(id) => {
                self.drafts.switch(id)?;
                self.draft_list()
            }
            Command::Rename(id, title) => {
                if self.drafts.rename(id, &title)? {
                    self.draft_list()
                } else {
                    "空の名前は使えません".to_string()
                }
            }
            Command::Close(id) => {
                self.drafts.close(id)?;
                self.draft_list()
            }
            Command::ShowDraft => {
                let draft = self.drafts.active();
                format!("── {} (#{}) ──\n{}", draft.title, draft.id, draft.content)
            }
            Command::LoadDraft(path) => {
                let content = read_text(&path)?;
                self.drafts.edit(content);
                format!("✔ {} を読み込みました", path.display())
            }
            Command::SaveDraft(path) => {
                std::fs::write(&path, &self.drafts.active().content)?;
                format!("✔ 保存しました: {}", path.display())
            }
            Command::Undo => {
                let done = self.drafts.undo();
                (if done { "↶ 元に戻しました" } else { "元に戻す操作はありません" }).to_string()
            }
            Command::Redo => {
                let done = self.drafts.redo();
                (if done { "↷ やり直しました" } else { "やり直す操作はありません" }).to_string()
            }
            Command::ClearChat => {
                let count = self.chat.history().len();
                self.chat.clear();
                format!("✔ 会話履歴を消去しました（{}件）", count)
            }
            Command::Help => HELP.to_string(),
            Command::Invalid(line) => format!("不明なコマンド: {} (/help で一覧)", line),
            Command::Chat(_) | Command::Quit | Command::Empty => String::new(),
        };
        Ok(message)
    }

    fn file_list(&self) -> String {
        if self.library.is_empty() {
            return "ファイルはまだ読み込まれていません".to_string();
        }
        self.library
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mark = if self.library.is_selected(i) { "●" } else { "○" };
                let status = match &record.error {
                    Some(e) => format!("⚠ {}", e),
                    None => format!("{}グループ", record.groups.len()),
                };
                format!("{} {}. {} ({})", mark, i + 1, record.name, status)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draft_list(&self) -> String {
        let active = self.drafts.active().id;
        self.drafts
            .drafts()
            .map(|d| {
                let mark = if d.id == active { "▶" } else { " " };
                format!("{} #{} {} ({}文字)", mark, d.id, d.title, d.content.chars().count())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VibeError::FileNotFound(path.display().to_string()),
        _ => VibeError::Io(e),
    })
}

fn prompt_line(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| VibeError::CliExecution(e.to_string()))
}

/// ブロックごとに採否を決め、適用したら true
fn run_review(review: &mut Review) -> Result<bool> {
    if let Some(notes) = review.notes() {
        println!("📝 {}", notes);
    }
    loop {
        println!();
        for block in review.blocks() {
            print!("{}", render::block(block, review.is_accepted(block.index)));
        }
        println!(
            "採用 {}/{}  [番号]切替 a:全採用 r:全却下 p:プレビュー y:適用 n:破棄",
            review.accepted_count(),
            review.blocks().len()
        );

        match parse_review_action(&prompt_line("レビュー")?) {
            ReviewAction::Toggle(index) => {
                if !review.toggle(index) {
                    println!("ブロック番号が範囲外です: {}", index);
                }
            }
            ReviewAction::AcceptAll => review.accept_all(),
            ReviewAction::RejectAll => review.reject_all(),
            ReviewAction::Preview => println!("{}", review.preview()),
            ReviewAction::Apply => return Ok(true),
            ReviewAction::Discard => return Ok(false),
            ReviewAction::Invalid => println!("a / r / p / y / n またはブロック番号を入力してください"),
        }
    }
}

/// 対話セッションを開始
pub async fn run_session(
    config: &Config,
    assistant: Box<dyn Assistant>,
    paths: &[PathBuf],
    draft: Option<&Path>,
) -> Result<()> {
    let system_prompt = load_system_prompt(config.system_prompt_path.as_deref());
    let log = SessionLog::from_config(config)?;
    let mut workspace = Workspace::new(assistant, system_prompt, log);

    println!("✍ vibewriting - 執筆セッション（/help でコマンド一覧）\n");

    if !paths.is_empty() {
        match workspace.execute(Command::AddFiles(paths.to_vec())).await {
            Ok(message) => println!("{}\n", message),
            Err(e) => println!("⚠ {}\n", e),
        }
    }
    if let Some(path) = draft {
        println!("{}\n", workspace.execute(Command::LoadDraft(path.to_path_buf())).await?);
    }

    loop {
        let title = workspace.drafts.active().title.clone();
        let line = prompt_line(&format!("[{}]", title))?;

        match parse_command(&line) {
            Command::Quit => break,
            Command::Empty => continue,
            Command::Chat(message) => match workspace.ask(&message).await {
                Ok(turn) => {
                    println!("\n🤖 {}\n", turn.reply);
                    if let Some(mut review) = turn.review {
                        if run_review(&mut review)? {
                            match workspace.commit(&review) {
                                Ok(()) => println!("✔ 下書きに反映しました"),
                                Err(e) => println!("⚠ {}", e),
                            }
                        } else {
                            println!("提案を破棄しました");
                        }
                    }
                }
                Err(e) => println!("\n🤖 Error: {}\n", e),
            },
            command => match workspace.execute(command).await {
                Ok(message) => println!("{}", message),
                Err(e) => println!("⚠ {}", e),
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ChatMessage, ChatReply};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// 決まった応答を返し、受け取ったシステムプロンプトを記録する
    struct Scripted {
        reply: String,
        seen_prompt: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl Assistant for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _: &[ChatMessage], system_prompt: Option<&str>) -> Result<ChatReply> {
            *self.seen_prompt.lock().unwrap() = system_prompt.map(String::from);
            Ok(ChatReply {
                content: self.reply.clone(),
                usage: serde_json::Value::Null,
            })
        }
    }

    fn scripted(reply: &str, log_dir: &Path) -> (Workspace, Arc<Mutex<Option<String>>>) {
        let seen_prompt = Arc::new(Mutex::new(None));
        let assistant = Scripted {
            reply: reply.to_string(),
            seen_prompt: Arc::clone(&seen_prompt),
        };
        let ws = Workspace::new(Box::new(assistant), "BASE".into(), SessionLog::new(log_dir, true));
        (ws, seen_prompt)
    }

    fn workspace(reply: &str, log_dir: &Path) -> Workspace {
        scripted(reply, log_dir).0
    }

    // =============================================
    // コマンド解析
    // =============================================

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("tighten the intro"), Command::Chat("tighten the intro".into()));
        assert_eq!(parse_command("/select 2"), Command::SelectOnly(1));
        assert_eq!(parse_command("/toggle 1"), Command::Toggle(0));
        assert_eq!(parse_command("/rename 3 Final notes"), Command::Rename(3, "Final notes".into()));
        assert_eq!(
            parse_command("/add a.pdf dir"),
            Command::AddFiles(vec![PathBuf::from("a.pdf"), PathBuf::from("dir")])
        );
        assert_eq!(parse_command("/q"), Command::Quit);
    }

    #[test]
    fn test_parse_command_rejects_bad_arguments() {
        assert!(matches!(parse_command("/select 0"), Command::Invalid(_)));
        assert!(matches!(parse_command("/switch x"), Command::Invalid(_)));
        assert!(matches!(parse_command("/rename 2"), Command::Invalid(_)));
        assert!(matches!(parse_command("/add"), Command::Invalid(_)));
        assert!(matches!(parse_command("/frobnicate"), Command::Invalid(_)));
    }

    #[test]
    fn test_parse_review_action() {
        assert_eq!(parse_review_action("3"), ReviewAction::Toggle(3));
        assert_eq!(parse_review_action(" a "), ReviewAction::AcceptAll);
        assert_eq!(parse_review_action("r"), ReviewAction::RejectAll);
        assert_eq!(parse_review_action("y"), ReviewAction::Apply);
        assert_eq!(parse_review_action("n"), ReviewAction::Discard);
        assert_eq!(parse_review_action("maybe"), ReviewAction::Invalid);
    }

    // =============================================
    // ワークスペース
    // =============================================

    #[tokio::test]
    async fn test_draft_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace("", dir.path());

        let source = dir.path().join("draft.md");
        std::fs::write(&source, "# Notes\n\nbody").unwrap();
        ws.execute(Command::LoadDraft(source)).await.unwrap();
        assert_eq!(ws.drafts.active().content, "# Notes\n\nbody");

        ws.execute(Command::NewDraft).await.unwrap();
        assert_eq!(ws.drafts.active().id, 2);
        ws.execute(Command::Rename(2, "Outline".into())).await.unwrap();
        ws.execute(Command::Switch(1)).await.unwrap();

        assert_eq!(ws.execute(Command::Undo).await.unwrap(), "↶ 元に戻しました");
        assert_eq!(ws.drafts.active().content, "");
        ws.execute(Command::Redo).await.unwrap();

        let target = dir.path().join("out.md");
        ws.execute(Command::SaveDraft(target.clone())).await.unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "# Notes\n\nbody");

        let list = ws.execute(Command::ListDrafts).await.unwrap();
        assert!(list.contains("▶ #1 Draft 1"));
        assert!(list.contains("#2 Outline"));

        assert!(matches!(
            ws.execute(Command::Switch(9)).await,
            Err(VibeError::Core(vibewriting_common::Error::UnknownDraft(9)))
        ));
    }

    #[tokio::test]
    async fn test_add_files_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let pdfs = dir.path().join("pdfs");
        std::fs::create_dir(&pdfs).unwrap();
        std::fs::write(pdfs.join("broken.pdf"), b"not a pdf").unwrap();

        let mut ws = workspace("", &dir.path().join("logs"));
        let message = ws.execute(Command::AddFiles(vec![pdfs.clone()])).await.unwrap();
        assert!(message.contains("1件"));
        assert!(message.contains("broken.pdf (⚠"));
        assert!(ws.library.is_selected(0));

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(matches!(ws.add_files(&[empty]).await, Err(VibeError::NoPdfsFound(_))));
    }

    #[tokio::test]
    async fn test_ask_builds_review_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "Here you go.\n```json\n{\"operations\":[{\"type\":\"patch\",\"find\":\"line2\",\"replace\":\"lineX\"}],\"notes\":\"renamed\"}\n```";
        let (mut ws, seen_prompt) = scripted(reply, dir.path());
        ws.drafts.edit("line1\nline2\nline3".into());

        let turn = ws.ask("rename line2").await.unwrap();
        assert_eq!(turn.reply, reply);
        let prompt = seen_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.starts_with("BASE"));
        assert!(prompt.contains("line1\nline2\nline3"));
        let review = turn.review.expect("proposal should produce a review");
        assert_eq!(review.blocks().len(), 1);
        assert_eq!(review.notes(), Some("renamed"));

        ws.commit(&review).unwrap();
        assert_eq!(ws.drafts.active().content, "line1\nlineX\nline3");
        assert_eq!(ws.chat().history().len(), 2);
        assert_eq!(SessionLog::new(dir.path(), true).info().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_commit_after_manual_edit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "```json\n{\"operations\":[{\"type\":\"replace_all\",\"text\":\"new\"}]}\n```";
        let mut ws = workspace(reply, dir.path());
        ws.drafts.edit("old".into());

        let review = ws.ask("rewrite").await.unwrap().review.unwrap();
        ws.drafts.edit("edited meanwhile".into());
        assert!(matches!(
            ws.commit(&review),
            Err(VibeError::Core(vibewriting_common::Error::DraftChanged(1)))
        ));
        assert_eq!(ws.drafts.active().content, "edited meanwhile");
    }

    #[tokio::test]
    async fn test_plain_reply_has_no_review() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace("Just an opinion, no edits.", dir.path());
        let turn = ws.ask("thoughts?").await.unwrap();
        assert!(turn.review.is_none());
    }

    #[tokio::test]
    async fn test_clear_chat_keeps_draft() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace("noted", dir.path());
        ws.drafts.edit("keep me".into());
        ws.ask("first").await.unwrap();
        assert_eq!(ws.chat().history().len(), 2);

        assert_eq!(parse_command("/clear"), Command::ClearChat);
        let message = ws.execute(Command::ClearChat).await.unwrap();
        assert!(message.contains("2件"));
        assert!(ws.chat().history().is_empty());
        assert_eq!(ws.drafts.active().content, "keep me");
        assert!(ws.drafts.can_undo());
    }
}
