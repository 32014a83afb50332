//! AIアシスタント連携
//!
//! - `Assistant`: バックエンド共通のトレイト（OpenAI互換API / claude CLI）
//! - `ChatSession`: 会話履歴と送信中フラグ
//! - `CallOutcome`: `{ok, data | error}` 形式の呼び出し結果

mod claude_cli;
mod openai;
mod session;

pub use claude_cli::ClaudeCliAssistant;
pub use openai::OpenAiAssistant;
pub use session::ChatSession;

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vibewriting_common::DEFAULT_SYSTEM_PROMPT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// 応答本文とトークン使用量（バックエンドが返さなければ null）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default)]
    pub usage: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChatReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<std::result::Result<ChatReply, E>> for CallOutcome {
    fn from(result: std::result::Result<ChatReply, E>) -> Self {
        match result {
            Ok(reply) => Self { ok: true, data: Some(reply), error: None },
            Err(e) => Self { ok: false, data: None, error: Some(e.to_string()) },
        }
    }
}

#[async_trait]
pub trait Assistant: Send + Sync {
    fn name(&self) -> &str;

    /// `messages` は会話履歴（system を含まない）。
    /// `system_prompt` があれば先頭に system メッセージとして付ける。
    async fn chat(&self, messages: &[ChatMessage], system_prompt: Option<&str>) -> Result<ChatReply>;
}

pub fn create_assistant(provider: AiProvider, config: &Config) -> Result<Box<dyn Assistant>> {
    tracing::debug!(provider = %provider, model = %config.model, "creating assistant");
    match provider {
        AiProvider::Openai => Ok(Box::new(OpenAiAssistant::new(config)?)),
        AiProvider::Claude => Ok(Box::new(ClaudeCliAssistant::new())),
    }
}

/// 既定システムプロンプトを読み込む（失敗時は組み込みプロンプト）
///
/// セッション開始時に1度だけ呼び、結果を保持して使う。
pub fn load_system_prompt(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    };
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "system prompt file is empty, using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read system prompt ({}), using built-in prompt", e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}
