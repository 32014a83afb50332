use super::{Assistant, ChatMessage, ChatReply};
use crate::error::{Result, VibeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 会話履歴（user / assistant）
///
/// 送信は1件ずつ。応答待ちの間の送信は `ChatBusy` になる。
/// 失敗した呼び出しは "Error: ..." の assistant メッセージとして履歴に残る。
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    busy: Arc<AtomicBool>,
}

/// 送信中フラグ。ドロップ（キャンセル含む）で解除される。
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn begin(&self) -> Result<InFlight> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(VibeError::ChatBusy);
        }
        Ok(InFlight(Arc::clone(&self.busy)))
    }

    pub async fn send(
        &mut self,
        assistant: &dyn Assistant,
        text: &str,
        system_prompt: Option<&str>,
    ) -> Result<ChatReply> {
        let _in_flight = self.begin()?;
        self.history.push(ChatMessage::user(text));

        match assistant.chat(&self.history, system_prompt).await {
            Ok(reply) => {
                self.history.push(ChatMessage::assistant(reply.content.clone()));
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(backend = assistant.name(), "chat call failed: {}", e);
                self.history.push(ChatMessage::assistant(format!("Error: {}", e)));
                Err(e)
            }
        }
    }
}
