use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::semantic::{GenerationError, TextGenerator};

const SYSTEM_PROMPT: &str = "You are a startup investment analyst. \
    Always answer with a single JSON object containing match_score, highlights and traction.";

/// OpenAI-compatible chat request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// Text generator backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatCompletionsGenerator {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: Client,
}

impl ChatCompletionsGenerator {
    /// Create a new generator
    ///
    /// `endpoint` is the API base, e.g. `https://api.openai.com/v1`.
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            model,
            temperature,
            max_tokens,
            client,
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut req_builder = self.client.post(self.chat_completions_url());
        if !self.api_key.is_empty() {
            req_builder = req_builder.bearer_auth(&self.api_key);
        }

        let response = req_builder.json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Text generation API error: status={} body={}", status, body);
            return Err(GenerationError::ApiError(format!(
                "Generation request failed: {}",
                status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No content in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(endpoint: String) -> ChatCompletionsGenerator {
        ChatCompletionsGenerator::new(
            endpoint,
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
            0.2,
            400,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "{\"match_score\": 0.9}"}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let reply = generator(server.url()).generate("rate this").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "{\"match_score\": 0.9}");
    }

    #[tokio::test]
    async fn test_generate_maps_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = generator(server.url()).generate("rate this").await.unwrap_err();
        assert!(matches!(err, GenerationError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = generator(server.url()).generate("rate this").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }
}
