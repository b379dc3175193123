//! Conversational service port and its OpenAI-compatible client.

use crate::chat::{ChatMessage, ChatRequest, Role};
use crate::config::ChatConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No API key configured for the chat service")]
    MissingApiKey,
    #[error("Chat runtime failed to start: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

/// Resolves one request to the assistant's reply text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError>;
}

#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        if config.api_key.is_none() {
            log::warn!("No chat API key set; visitors will stay silent");
        }
        Self::new(
            &config.endpoint,
            &config.model,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl ChatService for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;
        let api_request = OpenAIChatRequest {
            model: &self.model,
            messages: build_messages(&request),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| ChatError::RequestFailed(e.to_string()))?;
            return Err(ChatError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

fn build_messages(request: &ChatRequest) -> Vec<OpenAIMessage> {
    request
        .messages
        .iter()
        .map(|message: &ChatMessage| OpenAIMessage {
            role: message.role,
            content: match &message.image {
                Some(url) if message.role == Role::User => OpenAIContent::Parts(vec![
                    OpenAIPart::Text {
                        text: message.content.clone(),
                    },
                    OpenAIPart::ImageUrl {
                        image_url: OpenAIImageUrl { url: url.clone() },
                    },
                ]),
                _ => OpenAIContent::Text(message.content.clone()),
            },
        })
        .collect()
}

fn convert_response(response: OpenAIChatResponse) -> Result<String, ChatError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::InvalidResponse("No choices in chat response".to_string()))?;

    choice
        .message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ChatError::InvalidResponse("Empty message content".to_string()))
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: Role,
    content: OpenAIContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Debug, Serialize)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
