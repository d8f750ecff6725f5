
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::{SearchResult, VectorRecord};
use crate::config::Config;
use crate::{RagError, Result};

/// Vector store keeping every record in memory, mirrored to a single JSON file.
///
/// Every mutation rewrites the whole file in place. There is no atomic rename,
/// so a crash in the middle of a write can leave a truncated file behind.
/// Search is an exact linear scan over all records.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    dimension: usize,
    records: Vec<VectorRecord>,
    opened: bool,
}

impl VectorStore {
    /// Create a store backed by `path` holding vectors of length `dimension`.
    ///
    /// Nothing is read until [`VectorStore::open`] is called.
    #[inline]
    pub fn new(path: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            path: path.into(),
            dimension,
            records: Vec::new(),
            opened: false,
        }
    }

    /// Create and open the store described by the application configuration
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut store = Self::new(
            config.vector_store_path(),
            config.ollama.embedding_dimension as usize,
        );
        store.open().await?;
        Ok(store)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Load the backing file into memory.
    ///
    /// A missing file means an empty store. Calling this again once the store
    /// is open does nothing.
    #[inline]
    pub async fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }

        debug!("Opening vector store at {}", self.path.display());

        let records = match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let records: Vec<VectorRecord> = serde_json::from_slice(&bytes).map_err(|e| {
                    error!("Vector store file {} is unreadable: {}", self.path.display(), e);
                    RagError::Storage(format!(
                        "Failed to parse vector store file {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                self.check_loaded_dimensions(&records)?;
                info!(
                    "Loaded {} vectors from {}",
                    records.len(),
                    self.path.display()
                );
                records
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No vector store file at {}, starting empty",
                    self.path.display()
                );
                Vec::new()
            }
            Err(source) => {
                error!("Failed to read vector store {}: {}", self.path.display(), source);
                return Err(RagError::StorageIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        self.records = records;
        self.opened = true;
        Ok(())
    }

    fn check_loaded_dimensions(&self, records: &[VectorRecord]) -> Result<()> {
        if let Some(record) = records.iter().find(|r| r.vector.len() != self.dimension) {
            warn!(
                "Record {} has {} dimensions, store expects {}",
                record.id,
                record.vector.len(),
                self.dimension
            );
            return Err(RagError::Storage(format!(
                "Vector store {} holds {}-dimensional vectors but {} dimensions are configured; clear the store after changing embedding models",
                self.path.display(),
                record.vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.opened {
            Ok(())
        } else {
            Err(RagError::Storage(format!(
                "Vector store {} has not been opened",
                self.path.display()
            )))
        }
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> Result<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(RagError::Validation(format!(
                "{} has {} dimensions, expected {}",
                what,
                vector.len(),
                self.dimension
            )))
        }
    }

    /// Insert or replace records, then rewrite the backing file.
    ///
    /// A record whose id already exists replaces the old one entirely and
    /// moves to the end of the storage order. Memory is only updated once the
    /// file has been written.
    #[inline]
    pub async fn upsert(&mut self, records: Vec<VectorRecord>) -> Result<()> {
        self.open().await?;

        for record in &records {
            self.check_dimension(&record.vector, &format!("Vector for record {}", record.id))?;
        }

        let count = records.len();
        let mut updated = self.records.clone();
        for record in records {
            updated.retain(|existing| existing.id != record.id);
            updated.push(record);
        }

        self.persist(&updated).await?;
        self.records = updated;
        info!("Upserted {} vectors ({} total)", count, self.records.len());
        Ok(())
    }

    /// Exact nearest-neighbour search by cosine similarity.
    ///
    /// Results are sorted by descending score; records with equal scores keep
    /// their storage order.
    #[inline]
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.ensure_open()?;

        if self.records.is_empty() || limit == 0 {
            debug!("Vector search on empty store or zero limit");
            return Ok(Vec::new());
        }

        self.check_dimension(query, "Query vector")?;

        let mut results: Vec<SearchResult> = self
            .records
            .iter()
            .map(|record| SearchResult {
                id: record.id.clone(),
                score: cosine_similarity(query, &record.vector),
                payload: record.payload.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        debug!("Vector search returned {} results", results.len());
        Ok(results)
    }

    #[inline]
    pub fn count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.records.len())
    }

    #[inline]
    pub fn get(&self, id: &str) -> Result<Option<&VectorRecord>> {
        self.ensure_open()?;
        Ok(self.records.iter().find(|r| r.id == id))
    }

    /// Drop every record and persist the empty set.
    ///
    /// Works on an unopened store too, so a file that fails to load can still
    /// be reset.
    #[inline]
    pub async fn clear(&mut self) -> Result<()> {
        self.persist(&[]).await?;
        let removed = self.records.len();
        self.records.clear();
        self.opened = true;
        info!("Cleared vector store ({} vectors removed)", removed);
        Ok(())
    }

    async fn persist(&self, records: &[VectorRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RagError::StorageIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, bytes).await.map_err(|source| {
            error!("Failed to write vector store {}: {}", self.path.display(), source);
            RagError::StorageIo {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(
            "Persisted {} vectors to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0 when either vector has zero norm or the result is not finite.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}
