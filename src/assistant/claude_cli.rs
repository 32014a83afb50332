//! Claude CLI連携
//!
//! `claude -p <prompt> --output-format text` を1回呼び出す。
//! CLI は会話を持たないので、システムプロンプトと履歴を1つのプロンプトにまとめる。

use super::{Assistant, ChatMessage, ChatReply, Role};
use crate::error::{Result, VibeError};
use async_trait::async_trait;
use tokio::process::Command;

pub struct ClaudeCliAssistant {
    program: String,
}

impl ClaudeCliAssistant {
    pub fn new() -> Self {
        Self { program: "claude".into() }
    }

    async fn run(&self, prompt: &str) -> Result<String> {
        // Windowsではcmd /c経由
        #[cfg(windows)]
        let output = Command::new("cmd")
            .args(["/c", self.program.as_str(), "-p", prompt, "--output-format", "text"])
            .output()
            .await;

        #[cfg(not(windows))]
        let output = Command::new(&self.program)
            .args(["-p", prompt, "--output-format", "text"])
            .output()
            .await;

        let output = output.map_err(|e| VibeError::CliExecution(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VibeError::CliExecution(format!(
                "Claude CLI failed (code {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

impl Default for ClaudeCliAssistant {
    fn default() -> Self {
        Self::new()
    }
}

/// システムプロンプト + 会話履歴 → 単一プロンプト
fn render_prompt(messages: &[ChatMessage], system_prompt: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(system.trim_end());
        prompt.push_str("\n\n# Conversation\n");
    }

    for message in messages {
        let speaker = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("\n{}: {}\n", speaker, message.content));
    }
    prompt.push_str("\nAssistant:");
    prompt
}

#[async_trait]
impl Assistant for ClaudeCliAssistant {
    fn name(&self) -> &str {
        "claude"
    }

    async fn chat(&self, messages: &[ChatMessage], system_prompt: Option<&str>) -> Result<ChatReply> {
        let prompt = render_prompt(messages, system_prompt);
        tracing::debug!(length = prompt.len(), "running claude CLI");

        let content = self.run(&prompt).await?;
        tracing::debug!(length = content.len(), "claude CLI reply received");

        Ok(ChatReply {
            content,
            usage: serde_json::Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_with_system() {
        let prompt = render_prompt(
            &[ChatMessage::user("summarise"), ChatMessage::assistant("ok"), ChatMessage::user("more")],
            Some("You help.\n"),
        );
        assert!(prompt.starts_with("You help.\n\n# Conversation\n"));
        let user = prompt.find("User: summarise").unwrap();
        let assistant = prompt.find("Assistant: ok").unwrap();
        assert!(user < assistant);
        assert!(prompt.ends_with("User: more\n\nAssistant:"));
    }

    #[test]
    fn test_render_prompt_without_system() {
        let prompt = render_prompt(&[ChatMessage::user("hi")], None);
        assert_eq!(prompt, "\nUser: hi\n\nAssistant:");
    }

    #[tokio::test]
    async fn test_missing_program_is_cli_error() {
        let assistant = ClaudeCliAssistant {
            program: "vibewriting-no-such-program".into(),
        };
        let err = assistant.chat(&[ChatMessage::user("hi")], None).await.unwrap_err();
        assert!(matches!(err, VibeError::CliExecution(_)));
    }
}
