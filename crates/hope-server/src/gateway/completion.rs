// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use hope_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{http_client, provider_message};

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [PromptMessage<'a>; 1],
}

#[derive(Serialize)]
struct PromptMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiCompletion {
    url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    #[must_use]
    pub fn new(base_url: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            client: http_client(Duration::from_secs(15)),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [PromptMessage {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("completion provider unreachable: {e}");
                Error::gateway("Completion service unavailable")
            })?;
        if !resp.status().is_success() {
            let message = provider_message(resp).await;
            warn!(%message, "completion rejected");
            return Err(Error::gateway("Failed to get response from AI"));
        }
        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|_| Error::gateway("Failed to get response from AI"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::gateway("Failed to get response from AI"))
    }
}

/// Installed when no API key is configured.
#[derive(Debug, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl CompletionProvider for DisabledCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::gateway("AI responses are not configured"))
    }
}

/// Echoes a fixed reply.
#[derive(Debug, Clone)]
pub struct FakeCompletion(pub String);

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
