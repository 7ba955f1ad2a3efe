//! OpenAI-compatible LLM client.
//!
//! Both the chat agent and the judge talk to the model through this client.
//! It works with any OpenAI-compatible chat completions endpoint.

use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    // Null when the model only returned tool calls or was filtered.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Token counts reported by the API.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Turn a non-success HTTP response into an error, preferring the API's message.
fn api_error(status: StatusCode, body: &str) -> EvalError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => EvalError::LlmApi(format!("API error ({}): {}", status, parsed.error.message)),
        Err(_) => EvalError::LlmApi(format!("Request failed ({}): {}", status, body)),
    }
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Same endpoint and key, different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Same endpoint and key, different sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        Self::parse_completion(&body)
    }

    fn parse_completion(body: &str) -> Result<LlmResponse> {
        let parsed: CompletionBody = serde_json::from_str(body)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::LlmApi("No choices in response".to_string()))?;

        if let Some(usage) = parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion finished"
            );
        }

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: parsed.usage,
        })
    }

    /// Single user message with an optional system prompt.
    pub async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let messages = system
            .map(Message::system)
            .into_iter()
            .chain(std::iter::once(Message::user(user)))
            .collect();

        Ok(self.chat(messages).await?.content)
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let reply = self
            .complete(None, "Say 'hello' and nothing else.")
            .await?;

        if reply.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(EvalError::LlmApi(format!("Unexpected response: {}", reply)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> LlmConfig {
        LlmConfig {
            api_base: api_base.to_string(),
            api_key: "test".to_string(),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message::assistant("Dobrý den")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Dobrý den"}"#);
        assert_eq!(Message::system("x").role, Role::System);
        assert_eq!(Message::user("x").role, Role::User);
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let with_slash = LlmClient::new(config("https://api.example.com/"));
        let without = LlmClient::new(config("https://api.example.com"));
        assert_eq!(with_slash.endpoint(), "https://api.example.com/v1/chat/completions");
        assert_eq!(without.endpoint(), with_slash.endpoint());
    }

    #[test]
    fn test_derived_clients_keep_endpoint() {
        let client = LlmClient::new(config("https://api.example.com"));
        let judge = client.clone().with_model("gpt-4o").with_temperature(0.1);

        assert_eq!(judge.model(), "gpt-4o");
        assert_eq!(judge.config.temperature, 0.1);
        assert_eq!(judge.endpoint(), client.endpoint());
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Úřad je otevřen v pondělí."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 9, "total_tokens": 129}
        }"#;
        let response = LlmClient::parse_completion(body).unwrap();
        assert_eq!(response.content, "Úřad je otevřen v pondělí.");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 129);
    }

    #[test]
    fn test_parse_completion_with_null_content_or_no_choices() {
        let null_content = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(LlmClient::parse_completion(null_content).unwrap().content, "");

        let no_choices = r#"{"choices":[]}"#;
        assert!(matches!(
            LlmClient::parse_completion(no_choices),
            Err(EvalError::LlmApi(_))
        ));
    }

    #[test]
    fn test_api_error_prefers_api_message() {
        let err = api_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#,
        );
        assert!(err.to_string().contains("Rate limit reached"));

        let err = api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.to_string().contains("<html>bad gateway</html>"));
    }
}
