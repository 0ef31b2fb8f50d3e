//! OpenAI provider implementation

use super::super::bridge::{AIProvider, Completion};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.unwrap_or_else(|| std::env::var("OPENAI_API_KEY").unwrap_or_default()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            url: CHAT_COMPLETIONS_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Point at an OpenAI-compatible endpoint.
    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u32,
}

#[async_trait::async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        if self.api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is not set");
        }

        let request = OpenAIRequest {
            model: &self.model,
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;
        let tokens_used = body.usage.map(|u| u.total_tokens).unwrap_or(0);
        let choice = body
            .choices
            .into_iter()
            .next()
            .context("OpenAI response has no choices")?;

        Ok(Completion {
            content: choice.message.content,
            tokens_used,
        })
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}
