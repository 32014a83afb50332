//! OpenAI互換 chat/completions バックエンド（非ストリーミング）

use super::{Assistant, ChatMessage, ChatReply};
use crate::config::Config;
use crate::error::{Result, VibeError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenAiAssistant {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiAssistant {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| VibeError::ApiCall(format!("HTTPクライアント作成エラー: {}", e)))?;

        tracing::info!(url = %config.base_url, model = %config.model, "initialising chat backend");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: &[ChatMessage], system_prompt: Option<&str>) -> Result<ChatReply> {
        let system = system_prompt.map(ChatMessage::system);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: system.iter().chain(messages.iter()).collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        tracing::debug!(model = %self.model, messages = request.messages.len(), "sending chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VibeError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(VibeError::ApiCall(format!("{}: {}", status, message)));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VibeError::ApiParse(e.to_string()))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VibeError::ApiParse("choices が空です".into()))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(length = content.len(), "chat reply received");
        Ok(ChatReply { content, usage: result.usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        Config {
            api_key: Some("sk-test".into()),
            base_url: format!("{}/", server.uri()),
            model: "qwen-max-latest".into(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_chat_sends_system_prompt_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen-max-latest",
                "temperature": 0.7,
                "max_tokens": 2000,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "SYS"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi there"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = OpenAiAssistant::new(&config_for(&server)).unwrap();
        let reply = assistant
            .chat(&[ChatMessage::user("hello")], Some("SYS"))
            .await
            .unwrap();

        assert_eq!(reply.content, "hi there");
        assert_eq!(reply.usage["total_tokens"], 7);
    }

    #[tokio::test]
    async fn test_chat_error_status_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let assistant = OpenAiAssistant::new(&config_for(&server)).unwrap();
        let err = assistant.chat(&[ChatMessage::user("x")], None).await.unwrap_err();
        match err {
            VibeError::ApiCall(message) => assert!(message.contains("Incorrect API key")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_without_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let assistant = OpenAiAssistant::new(&config_for(&server)).unwrap();
        let err = assistant.chat(&[], None).await.unwrap_err();
        assert!(matches!(err, VibeError::ApiParse(_)));
    }
}
