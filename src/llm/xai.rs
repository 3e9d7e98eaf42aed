//! xAI chat completions client (OpenAI-compatible wire format).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

/// Default base URL of the xAI API.
pub const XAI_API_BASE_URL: &str = "https://api.x.ai/v1";

/// Chat completions client for xAI, or any OpenAI-compatible endpoint.
pub struct XaiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl XaiClient {
    /// Client for `base_url` sharing the service-wide HTTP client.
    pub fn with_base_url(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Execute a single request. Failures are returned as-is, never retried.
    async fn execute_request(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        let response = match self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let what = if e.is_timeout() {
                    "Request timeout"
                } else if e.is_connect() {
                    "Connection failed"
                } else {
                    "Request failed"
                };
                return Err(LlmError::network(format!("{}: {}", what, e)));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(LlmError::network(format!("Failed to read response: {}", e)));
            }
            Err(e) => format!("(failed to read error body: {})", e),
        };

        if !status.is_success() {
            return Err(LlmError::http(status.as_u16(), body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::parse("No choices in response".to_string()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            model: parsed.model.or_else(|| Some(request.model.clone())),
        })
    }
}

#[async_trait]
impl LlmClient for XaiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            max_tokens: options.max_tokens,
        };

        tracing::debug!(model = %model, "Sending chat completion request");

        let response = self.execute_request(&request).await;
        match &response {
            Ok(r) => {
                if let Some(usage) = &r.usage {
                    tracing::debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Chat completion finished"
                    );
                }
            }
            Err(e) => tracing::error!("Chat completion failed: {}", e),
        }
        response
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use crate::test_support::{MockServer, UNREACHABLE_BASE_URL};
    use serde_json::json;

    fn client_for(base_url: &str) -> XaiClient {
        XaiClient::with_base_url(Client::new(), "xai-test".to_string(), base_url.to_string())
    }

    #[tokio::test]
    async fn sends_model_prompt_and_max_tokens() {
        let server = MockServer::start(vec![(
            200,
            json!({
                "model": "grok-4",
                "choices": [{
                    "message": {"role": "assistant", "content": "1. Plan - Write it down"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
            }),
        )])
        .await;

        let options = ChatOptions {
            max_tokens: Some(500),
        };
        let response = client_for(&server.base_url)
            .chat_completion("grok-4", &[ChatMessage::user("Goal: x")], options)
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("1. Plan - Write it down"));
        assert_eq!(response.usage.unwrap().completion_tokens, 12);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/chat/completions");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer xai-test"));
        let body = requests[0].json();
        assert_eq!(body["model"], "grok-4");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Goal: x");
    }

    #[tokio::test]
    async fn http_error_carries_provider_message_without_retry() {
        let server =
            MockServer::start(vec![(503, json!({"error": "model overloaded"}))]).await;

        let err = client_for(&server.base_url)
            .chat_completion("grok-4", &[ChatMessage::user("hi")], ChatOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, LlmErrorKind::ServerError);
        assert_eq!(err.status_code, Some(503));
        assert!(err.message.contains("model overloaded"));
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn empty_choices_is_a_parse_error() {
        let server = MockServer::start(vec![(200, json!({"choices": []}))]).await;

        let err = client_for(&server.base_url)
            .chat_completion("grok-4", &[ChatMessage::user("hi")], ChatOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let err = client_for(UNREACHABLE_BASE_URL)
            .chat_completion("grok-4", &[ChatMessage::user("hi")], ChatOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, LlmErrorKind::NetworkError);
    }
}
