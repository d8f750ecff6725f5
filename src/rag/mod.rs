
pub mod intention;
pub mod prompts;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::{ChunkingEngine, DocumentMetadata};
use crate::config::{Config, RagConfig};
use crate::database::{RecordMetadata, RecordPayload, VectorRecord, VectorStore};
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::llm::{Generator, OllamaGenerator, SamplingParams, round_seconds};
use crate::{RagError, Result};

pub use intention::Intention;

/// Length of the source excerpt returned with a generated reply, in characters
pub const EXCERPT_CHARS: usize = 200;
const DEFAULT_SOURCE_TITLE: &str = "Document";

/// An inbound email to answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub success: bool,
    pub chunks_created: usize,
}

/// A stored chunk returned by [`RagPipeline::retrieve`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    /// Cosine similarity to the query
    pub score: f32,
    pub metadata: RecordMetadata,
    pub id: String,
}

/// A chunk that was used as context for a generated reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub title: String,
    pub excerpt: String,
    /// Similarity as a percentage
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStats {
    pub documents_found: usize,
    pub documents_used: usize,
    pub llm_processing_time: f64,
}

/// Drafted reply to an email, with the evidence it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResponse {
    pub success: bool,
    pub response: String,
    /// Mean similarity of the context chunks as a percentage, 0 without context
    pub confidence: u8,
    pub intention: Intention,
    pub sources: Vec<Source>,
    /// Total time spent answering, in seconds
    pub processing_time: f64,
    pub stats: ResponseStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseStats {
    pub total_chunks: usize,
    pub collection_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub vector_store: bool,
    pub llm: bool,
}

impl HealthReport {
    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.vector_store && self.llm
    }
}

/// Retrieval-augmented email answering.
///
/// Ingestion: document, chunks, embeddings, vector store. Answering: email,
/// intention, query embedding, search, rerank, generation.
pub struct RagPipeline {
    chunker: ChunkingEngine,
    store: RwLock<VectorStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    rag: RagConfig,
    sampling: SamplingParams,
    collection_name: String,
}

impl RagPipeline {
    /// Wire a pipeline from explicit components.
    ///
    /// The store is opened lazily on first use. Fails when the embedder and the
    /// store disagree on the vector dimension.
    #[inline]
    pub fn new(
        config: &Config,
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(RagError::Config(format!(
                "Embedder produces {} dimensions but the vector store holds {}",
                embedder.dimension(),
                store.dimension()
            )));
        }

        Ok(Self {
            chunker: ChunkingEngine::new(config.chunking.clone()),
            store: RwLock::new(store),
            embedder,
            generator,
            rag: config.rag.clone(),
            sampling: config.sampling.clone(),
            collection_name: config.storage.collection_name.clone(),
        })
    }

    /// Build the Ollama-backed pipeline described by `config` and open its store
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        info!("Initializing RAG pipeline...");

        let store = VectorStore::from_config(config).await?;
        let embedder = Arc::new(OllamaEmbedder::from_config(config)?);
        let generator = Arc::new(OllamaGenerator::from_config(config)?);

        let pipeline = Self::new(config, store, embedder, generator)?;
        info!("RAG pipeline initialized");
        Ok(pipeline)
    }

    #[inline]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn ensure_store_open(&self) -> Result<()> {
        if !self.store.read().await.is_open() {
            self.store.write().await.open().await?;
        }
        Ok(())
    }

    /// Chunk, embed and store a document.
    ///
    /// Chunks are embedded concurrently; any embedding failure aborts the
    /// whole ingest before anything is written.
    #[inline]
    pub async fn ingest(&self, content: &str, metadata: DocumentMetadata) -> Result<IngestResult> {
        validation::validate_document(content)?;

        info!(
            "Adding document: {}",
            metadata.title.as_deref().unwrap_or("untitled")
        );

        let chunks = self.chunker.chunk(content, &metadata);
        debug!("Embedding {} chunks", chunks.len());

        let embeddings: Vec<Vec<f32>> = stream::iter(&chunks)
            .map(|chunk| self.embedder.embed(&chunk.text))
            .buffered(self.rag.embedding_concurrency.max(1))
            .try_collect()
            .await?;

        let ingested_at = Utc::now();
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: RecordPayload {
                    text: chunk.text,
                    metadata: RecordMetadata {
                        chunk: chunk.metadata,
                        ingested_at,
                    },
                },
            })
            .collect();

        let chunks_created = records.len();
        if chunks_created > 0 {
            self.store.write().await.upsert(records).await?;
        }

        info!("Document added with {} chunks", chunks_created);
        Ok(IngestResult {
            success: true,
            chunks_created,
        })
    }

    /// Embed `query` and return the `top_k` most similar stored chunks
    #[inline]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        validation::validate_query(query, top_k)?;
        info!("RAG search for: \"{}\"", preview(query, 50));

        self.ensure_store_open().await?;
        let vector = self.embedder.embed(query).await?;
        let results = self.store.read().await.search(&vector, top_k)?;

        let documents: Vec<RetrievedDocument> = results
            .into_iter()
            .map(|result| RetrievedDocument {
                text: result.payload.text,
                score: result.score,
                metadata: result.payload.metadata,
                id: result.id,
            })
            .collect();

        info!("{} documents found", documents.len());
        Ok(documents)
    }

    /// Classify an email into one of the fixed intention labels.
    ///
    /// Never fails: a generation error degrades to [`Intention::Autre`].
    #[inline]
    pub async fn detect_intention(&self, subject: &str, body: &str) -> Intention {
        let prompt = prompts::intention_prompt(subject, body);

        match self.generator.generate(None, &prompt, &self.sampling).await {
            Ok(generation) => {
                let intention = Intention::from_reply(&generation.text);
                info!("Intention detected: {}", intention);
                intention
            }
            Err(e) => {
                warn!("Intention detection failed, using \"autre\": {}", e);
                Intention::Autre
            }
        }
    }

    /// Draft a reply to an email from the most relevant knowledge base chunks
    #[inline]
    pub async fn answer_email(&self, request: &EmailRequest) -> Result<GeneratedResponse> {
        let start = Instant::now();
        validation::validate_email(request)?;

        info!(
            "Processing email from: {}, subject: {}",
            request.from, request.subject
        );

        let query = format!("{}\n{}", request.subject, request.body);
        let intention = self.detect_intention(&request.subject, &request.body).await;

        let documents = self.retrieve(&query, self.rag.top_k).await?;
        let documents_found = documents.len();
        let top = rerank(documents, self.rag.rerank_top_n);
        let confidence = confidence_score(&top);

        let user_prompt = prompts::email_reply_prompt(request, &top);
        let generation = self
            .generator
            .generate(
                Some(prompts::EMAIL_SYSTEM_PROMPT),
                &user_prompt,
                &self.sampling,
            )
            .await?;

        let sources: Vec<Source> = top.iter().map(Source::from_document).collect();
        let processing_time = round_seconds(start.elapsed().as_secs_f64());

        info!(
            "Reply drafted in {:.2}s (confidence {}%, {} sources)",
            processing_time,
            confidence,
            sources.len()
        );

        Ok(GeneratedResponse {
            success: true,
            response: generation.text,
            confidence,
            intention,
            sources,
            processing_time,
            stats: ResponseStats {
                documents_found,
                documents_used: top.len(),
                llm_processing_time: generation.processing_time_seconds,
            },
        })
    }

    #[inline]
    pub async fn stats(&self) -> Result<KnowledgeBaseStats> {
        self.ensure_store_open().await?;
        let total_chunks = self.store.read().await.count()?;

        Ok(KnowledgeBaseStats {
            total_chunks,
            collection_name: self.collection_name.clone(),
        })
    }

    /// Remove every chunk from the knowledge base
    #[inline]
    pub async fn clear(&self) -> Result<()> {
        self.store.write().await.clear().await?;
        info!("Knowledge base {} cleared", self.collection_name);
        Ok(())
    }

    #[inline]
    pub async fn health_check(&self) -> HealthReport {
        let vector_store = match self.ensure_store_open().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Vector store health check failed: {}", e);
                false
            }
        };
        let llm = self.generator.is_available().await;

        HealthReport { vector_store, llm }
    }
}

/// Order documents by descending score and keep the first `top_n`.
///
/// Equal scores keep their relative order.
#[inline]
pub fn rerank(mut documents: Vec<RetrievedDocument>, top_n: usize) -> Vec<RetrievedDocument> {
    documents.sort_by(|a, b| b.score.total_cmp(&a.score));
    documents.truncate(top_n);
    documents
}

/// Mean score of `documents` as a percentage, 0 when empty
#[inline]
pub fn confidence_score(documents: &[RetrievedDocument]) -> u8 {
    if documents.is_empty() {
        return 0;
    }

    let total: f64 = documents.iter().map(|d| f64::from(d.score)).sum();
    to_percentage(total / documents.len() as f64)
}

fn to_percentage(score: f64) -> u8 {
    let percentage = (score * 100.0).round();
    if percentage.is_nan() {
        0
    } else {
        percentage.clamp(0.0, 100.0) as u8
    }
}

impl Source {
    fn from_document(document: &RetrievedDocument) -> Self {
        let excerpt: String = document.text.chars().take(EXCERPT_CHARS).collect();

        Self {
            title: document
                .metadata
                .title()
                .unwrap_or(DEFAULT_SOURCE_TITLE)
                .to_string(),
            excerpt: format!("{excerpt}..."),
            score: to_percentage(f64::from(document.score)),
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
