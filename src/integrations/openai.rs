//! OpenAI chat completions for the narrative step.
//!
//! The client carries the sampling settings from [`OpenAISettings`], so a
//! narrative call is just a system message plus one rendered prompt.

use std::env;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{
    OpenAISettings, DEFAULT_OPENAI_MAX_TOKENS, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_TEMPERATURE,
    ENV_OPENAI_API_KEY,
};
use crate::{Error, Result};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Key from `OPENAI_API_KEY`, default model and sampling.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(ENV_OPENAI_API_KEY)
            .map_err(|_| Error::ConfigError(format!("{} is not set", ENV_OPENAI_API_KEY)))?;
        Self::new(api_key)
    }

    /// Key, endpoint, model and sampling from settings. A missing key falls
    /// back to `OPENAI_API_KEY`.
    pub fn from_settings(settings: &OpenAISettings) -> Result<Self> {
        let client = match &settings.api_key {
            Some(key) => Self::new(key.clone())?,
            None => Self::from_env()?,
        };
        let client = match &settings.base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        };
        Ok(client.with_sampling(
            settings.model.clone(),
            settings.temperature,
            settings.max_tokens,
        ))
    }

    pub fn new<S: Into<String>>(api_key: S) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::ConfigError(format!("{} is empty", ENV_OPENAI_API_KEY)));
        }

        let http = Client::builder()
            .user_agent(concat!("chat_temperature/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::OpenAiError(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_OPENAI_TEMPERATURE,
            max_tokens: DEFAULT_OPENAI_MAX_TOKENS,
        })
    }

    /// Point the client at a compatible endpoint (proxy, local gateway).
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        self.model = model.into();
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `system` + `prompt` and return the first choice's text.
    pub async fn narrate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage::system(system), ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending chat completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::OpenAiError(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::OpenAiError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        serde_json::from_str::<ChatResponse>(&text)
            .map_err(|e| Error::OpenAiError(format!("invalid response: {}", e)))?
            .into_reply()
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let reason = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "API key rejected",
        StatusCode::TOO_MANY_REQUESTS => "rate limited",
        s if s.is_server_error() => "server error",
        _ => "request rejected",
    };
    Error::OpenAiError(format!("{} (status {}): {}", reason, status, body))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Always exactly one system and one user message.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatResponse {
    /// First choice's content; blank content counts as empty.
    fn into_reply(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::OpenAiError("empty response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(server: &MockServer) -> OpenAISettings {
        let mut settings = Config::defaults().openai;
        settings.api_key = Some("test_key".to_string());
        settings.base_url = Some(format!("{}/", server.base_url()));
        settings
    }

    fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::from_settings(&settings(server)).expect("client")
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let err = OpenAIClient::new("   ").unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref msg) if msg.contains("empty")));
    }

    #[test]
    fn test_new_uses_narrative_defaults() {
        let client = OpenAIClient::new("k").unwrap();
        assert_eq!(client.model(), DEFAULT_OPENAI_MODEL);
        assert_eq!(client.base_url(), OPENAI_API_URL);
    }

    #[test]
    fn test_from_settings_applies_endpoint_and_model() {
        let mut settings = Config::defaults().openai;
        settings.api_key = Some("k".to_string());
        settings.base_url = Some("http://localhost:8080/v1/".to_string());
        settings.model = "gpt-4.1-mini".to_string();

        let client = OpenAIClient::from_settings(&settings).unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(client.model(), "gpt-4.1-mini");
    }

    #[tokio::test]
    async fn narrate_sends_settings_and_both_messages() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("Authorization", "Bearer test_key")
                .is_true(|req| {
                    let body: serde_json::Value =
                        serde_json::from_slice(req.body().as_ref()).unwrap_or_default();
                    body["model"] == "gpt-4o-mini"
                        && body["max_tokens"] == 1000
                        && body["messages"][0]["role"] == "system"
                        && body["messages"][1]["content"] == "대화를 분석해줘"
                });
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "{\"summary\": \"좋아요\"}" } }
                ]
            }));
        });

        let reply = client(&server)
            .narrate("Respond in JSON.", "대화를 분석해줘")
            .await
            .unwrap();

        assert_eq!(reply, "{\"summary\": \"좋아요\"}");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn narrate_classifies_error_status() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("slow down");
        });

        let err = client(&server).narrate("s", "p").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("429"));
        assert!(msg.contains("slow down"));
        completion_mock.assert_calls(1);
    }

    #[test]
    fn status_error_truncates_long_bodies() {
        let body = "x".repeat(1_000);
        let err = status_error(StatusCode::UNAUTHORIZED, &body);
        let msg = err.to_string();

        assert!(msg.contains("API key rejected"));
        assert!(msg.len() < 400);
    }

    #[tokio::test]
    async fn narrate_rejects_invalid_json() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("not json");
        });

        let err = client(&server).narrate("s", "p").await.unwrap_err();
        assert!(err.to_string().contains("invalid response"));
    }

    #[test]
    fn blank_or_missing_content_is_empty_response() {
        for choices in [
            json!([]),
            json!([{ "message": { "role": "assistant", "content": null } }]),
            json!([{ "message": { "role": "assistant", "content": "  \n" } }]),
        ] {
            let response: ChatResponse =
                serde_json::from_value(json!({ "choices": choices })).unwrap();
            let err = response.into_reply().unwrap_err();
            assert!(err.to_string().contains("empty response"));
        }
    }
}
