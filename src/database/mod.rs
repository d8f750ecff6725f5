// Database module
// Record types and the file-backed vector store used for similarity search

pub mod vector_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunking::ChunkMetadata;

pub use vector_store::{VectorStore, cosine_similarity};

/// The durable unit of the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier; upserting an existing id replaces the record
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub text: String,
    pub metadata: RecordMetadata,
}

/// Chunk metadata (document fields plus index and size) and the ingestion time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(flatten)]
    pub chunk: ChunkMetadata,
    pub ingested_at: DateTime<Utc>,
}

impl RecordMetadata {
    #[inline]
    pub fn title(&self) -> Option<&str> {
        self.chunk.document.title.as_deref()
    }
}

/// One hit of a similarity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub payload: RecordPayload,
}
