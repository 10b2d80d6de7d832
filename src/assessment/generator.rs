use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::types::AuditError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, AuditError>;
}

/// OpenAI-compatible `chat/completions` client
pub struct OpenAiGenerator {
    http_client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(api_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, AuditError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AuditError::Generation("OpenAI API key not configured".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuditError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Generation(format!(
                "Completion request failed: {} - {}",
                status, body
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| AuditError::Generation(format!("Failed to parse completion: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AuditError::Generation("Completion has no content".to_string()))?;

        debug!("Completion received ({} chars)", text.len());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_sends_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  {\"ok\": true}  "}}]
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(
            format!("{}/v1/", server.uri()),
            Some("sk-test".to_string()),
            "gpt-4o-mini".to_string(),
        );

        let text = generator.generate("hello", "be terse").await.unwrap();
        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(server.uri(), Some("k".to_string()), "m".to_string());
        let err = generator.generate("p", "s").await.unwrap_err();
        assert!(matches!(err, AuditError::Generation(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new(server.uri(), Some("k".to_string()), "m".to_string());
        assert!(generator.generate("p", "s").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let generator = OpenAiGenerator::new("http://127.0.0.1:1".to_string(), None, "m".to_string());
        assert!(matches!(
            generator.generate("p", "s").await,
            Err(AuditError::Generation(_))
        ));
    }
}
