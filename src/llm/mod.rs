// Language model module
// Text generation behind the `Generator` trait, with an Ollama chat backend

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use ollama::OllamaGenerator;

/// Sampling options forwarded to the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
    pub repeat_penalty: f32,
}

impl Default for SamplingParams {
    #[inline]
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.3,
            top_k: 30,
            num_predict: 400,
            repeat_penalty: 1.3,
        }
    }
}

/// Text produced by a [`Generator`]
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Wall-clock time spent generating, rounded to hundredths of a second
    pub processing_time_seconds: f64,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `user_prompt`, optionally steered by a system prompt.
    ///
    /// Fails with [`crate::RagError::Generation`] when the model cannot be
    /// reached or is not installed.
    async fn generate(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        params: &SamplingParams,
    ) -> Result<Generation>;

    /// Whether the backing model is reachable and installed
    async fn is_available(&self) -> bool {
        true
    }
}

/// Round a duration in seconds to two decimal places
#[inline]
pub fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
