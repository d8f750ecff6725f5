// Embeddings module
// Text to vector conversion behind the `Embedder` trait, with an Ollama backend

pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use ollama::{OllamaClient, OllamaEmbedder};

/// Produces fixed-length embedding vectors for text
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single piece of text.
    ///
    /// Fails with [`crate::RagError::Embedding`] on empty text or when the
    /// backing model is unavailable.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}
