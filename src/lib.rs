use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage error on {}: {source}", .path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of a [`RagError`], used by callers that need to
/// map failures onto their own surface (exit codes, HTTP statuses, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Storage,
    Embedding,
    Generation,
    Config,
    Internal,
}

impl RagError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::StorageIo { .. } | Self::Serialization(_) => {
                ErrorKind::Storage
            }
            Self::Embedding(_) => ErrorKind::Embedding,
            Self::Generation(_) => ErrorKind::Generation,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

impl ErrorKind {
    /// HTTP-style status code for this kind of failure
    #[inline]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Storage | Self::Generation => 503,
            Self::Embedding | Self::Config | Self::Internal => 500,
        }
    }
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod llm;
pub mod rag;
