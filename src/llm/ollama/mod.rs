
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

use super::{Generation, Generator, SamplingParams, round_seconds};
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::{RagError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: u32,
    repeat_penalty: f32,
}

impl From<&SamplingParams> for ChatOptions {
    fn from(params: &SamplingParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            num_predict: params.num_predict,
            repeat_penalty: params.repeat_penalty,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// [`Generator`] backed by Ollama's non-streaming `/api/chat` endpoint
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(&config.ollama)
            .map_err(|e| RagError::Config(format!("{e:#}")))?;
        Ok(Self::new(client, config.ollama.model.clone()))
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_blocking(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        params: &SamplingParams,
    ) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            options: params.into(),
            stream: false,
        };

        let response_text = self.client.post_json("/api/chat", &request)?;
        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        params: &SamplingParams,
    ) -> Result<Generation> {
        let start = Instant::now();
        debug!(
            "Generating with {} (prompt length: {})",
            self.model,
            user_prompt.len()
        );

        let generator = self.clone();
        let system_prompt = system_prompt.map(str::to_string);
        let user_prompt = user_prompt.to_string();
        let params = params.clone();

        let text = tokio::task::spawn_blocking(move || {
            generator.chat_blocking(system_prompt.as_deref(), &user_prompt, &params)
        })
        .await
        .map_err(|e| RagError::Generation(format!("Generation task failed: {e}")))?
        .map_err(|e| {
            error!("Generation with {} failed: {:#}", self.model, e);
            RagError::Generation(format!("{e:#}"))
        })?;

        let processing_time_seconds = round_seconds(start.elapsed().as_secs_f64());
        info!("Response generated in {:.2}s", processing_time_seconds);

        Ok(Generation {
            text,
            processing_time_seconds,
        })
    }

    async fn is_available(&self) -> bool {
        let client = self.client.clone();
        let model = self.model.clone();
        matches!(
            tokio::task::spawn_blocking(move || client.health_check(&model)).await,
            Ok(Ok(()))
        )
    }
}
