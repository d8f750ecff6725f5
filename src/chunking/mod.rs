
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static CRLF_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n").expect("valid regex"));
static BLANK_LINES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
/// Sentence-ending punctuation followed by whitespace and an uppercase letter.
/// Abbreviations such as "M. Dupont" are split too.
static SENTENCE_BOUNDARY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+(?=\p{Lu})").expect("valid regex"));

/// Configuration for text chunking, in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Maximum length of the text carried over from the previous chunk
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 300,
        }
    }
}

/// Descriptive metadata supplied with a document at ingestion time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Document metadata plus the chunk-local fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    pub chunk_index: usize,
    pub chunk_size: usize,
}

/// A bounded segment of a document, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    /// Length of `text` in characters
    pub size: usize,
    pub metadata: ChunkMetadata,
}

/// Splits raw document text into overlapping, size-bounded chunks.
///
/// The output is a pure function of the input text and the configuration.
#[derive(Debug, Clone, Default)]
pub struct ChunkingEngine {
    config: ChunkingConfig,
}

impl ChunkingEngine {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk a document's text, attaching `metadata` to every chunk
    #[inline]
    pub fn chunk(&self, text: &str, metadata: &DocumentMetadata) -> Vec<Chunk> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size;
        let mut builder = ChunkBuilder::new(metadata);
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in split_into_sentences(&normalized) {
            let sentence_len = char_len(sentence);

            if sentence_len > chunk_size {
                if !current.is_empty() {
                    builder.push(std::mem::take(&mut current));
                    current_len = 0;
                }

                for piece in split_long_sentence(sentence, chunk_size) {
                    builder.push(piece);
                }
                continue;
            }

            let separator = usize::from(!current.is_empty());
            if current_len + separator + sentence_len > chunk_size {
                let closed = std::mem::take(&mut current);

                // Only carry as much of the previous chunk as still fits
                let budget = self
                    .config
                    .overlap
                    .min(chunk_size.saturating_sub(sentence_len + 1));
                let overlap = overlap_text(&closed, budget);
                if !overlap.is_empty() {
                    current.push_str(overlap);
                    current.push(' ');
                }
                builder.push(closed);

                current.push_str(sentence);
                current_len = char_len(&current);
            } else {
                if separator == 1 {
                    current.push(' ');
                }
                current.push_str(sentence);
                current_len += separator + sentence_len;
            }
        }

        if !current.trim().is_empty() {
            builder.push(current);
        }

        let chunks = builder.finish();
        debug!(
            "Chunked {} characters into {} chunks (avg {} characters)",
            char_len(&normalized),
            chunks.len(),
            chunks.iter().map(|c| c.size).sum::<usize>() / chunks.len().max(1)
        );

        chunks
    }
}

struct ChunkBuilder<'a> {
    metadata: &'a DocumentMetadata,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkBuilder<'a> {
    fn new(metadata: &'a DocumentMetadata) -> Self {
        Self {
            metadata,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let index = self.chunks.len();
        let size = char_len(&text);
        self.chunks.push(Chunk {
            text,
            index,
            size,
            metadata: ChunkMetadata {
                document: self.metadata.clone(),
                chunk_index: index,
                chunk_size: size,
            },
        });
    }

    fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Normalize line endings and whitespace
///
/// CRLF becomes LF, runs of three or more newlines become two, every run of
/// whitespace then collapses to a single space and the result is trimmed.
#[inline]
pub fn normalize_text(text: &str) -> String {
    let text = CRLF_REGEX.replace_all(text, "\n");
    let text = BLANK_LINES_REGEX.replace_all(&text, "\n\n");
    let text = WHITESPACE_REGEX.replace_all(&text, " ");
    text.trim().to_string()
}

/// Split normalized text into sentence-like units
#[inline]
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY_REGEX.find_iter(text).flatten() {
        // keep the punctuation mark, drop the whitespace that follows it
        let end = boundary.start() + 1;
        if let Some(sentence) = text.get(start..end) {
            sentences.push(sentence);
        }
        start = boundary.end();
    }

    if let Some(rest) = text.get(start..) {
        sentences.push(rest);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a sentence longer than `chunk_size` on word boundaries.
///
/// Pieces are as long as possible without exceeding `chunk_size`; a single
/// word longer than `chunk_size` becomes its own oversized piece.
fn split_long_sentence(sentence: &str, chunk_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in sentence.split(' ').filter(|w| !w.is_empty()) {
        let word_len = char_len(word);
        let separator = usize::from(!current.is_empty());

        if current_len + separator + word_len > chunk_size && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += separator + word_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

/// Trailing text of `text` carried into the next chunk.
///
/// At most `budget` characters, starting on a word boundary; empty when no
/// whole word fits.
fn overlap_text(text: &str, budget: usize) -> &str {
    if budget == 0 {
        return "";
    }

    let total = char_len(text);
    if total <= budget {
        return text.trim();
    }

    let start = text
        .char_indices()
        .nth(total - budget)
        .map_or(text.len(), |(i, _)| i);
    let (head, tail) = text.split_at(start);

    if head.ends_with(' ') || tail.starts_with(' ') {
        return tail.trim();
    }

    tail.split_once(' ').map_or("", |(_, rest)| rest.trim())
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}
