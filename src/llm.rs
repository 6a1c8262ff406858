//! Language-model boundary.
//!
//! [`LanguageModel`] maps `(context, question, model)` to an answer string.
//! [`OpenAiChat`] implements it over `POST {base_url}/chat/completions` with
//! a fixed system prompt. No retry is performed here: a failed call surfaces
//! as [`Error::ExternalService`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::openai::{self, OpenAiClient};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on the given context.";

/// Answers a question from a context string.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn answer(&self, context: &str, question: &str, model: &str) -> Result<String>;
}

/// The user message sent alongside [`SYSTEM_PROMPT`].
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{}\n\nQuery: {}\n\nAnswer:", context, question)
}

/// Chat-completions client.
pub struct OpenAiChat {
    client: OpenAiClient,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, config: &LlmConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn answer(&self, context: &str, question: &str, model: &str) -> Result<String> {
        let prompt = build_prompt(context, question);
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        debug!(model, context_bytes = context.len(), "chat completion request");

        let response = self
            .client
            .post("chat/completions")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external("OpenAI chat", format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::external(
                "OpenAI chat",
                format!("API returned {}: {}", status, openai::error_detail(&body_text)),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::external("OpenAI chat", format!("invalid response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::external("OpenAI chat", "response contained no message"))
    }
}
