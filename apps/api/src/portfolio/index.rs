//! In-memory vector index with cosine similarity search, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::portfolio::PortfolioError;

/// File name of the persisted index inside the vectorstore directory.
pub const STORE_FILE: &str = "portfolio.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: Uuid,
    pub tech_stack: String,
    pub link: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Name of the embedder that produced every vector below.
    pub embedder: String,
    pub dimension: usize,
    pub entries: Vec<IndexedEntry>,
}

impl VectorIndex {
    pub fn new(embedder: &str, dimension: usize) -> Self {
        Self {
            embedder: embedder.to_string(),
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, tech_stack: String, link: String, embedding: Vec<f32>) {
        self.entries.push(IndexedEntry {
            id: Uuid::new_v4(),
            tech_stack,
            link,
            embedding,
        });
    }

    /// Whether vectors in this index are comparable with the given embedder's.
    pub fn is_compatible(&self, embedder: &str, dimension: usize) -> bool {
        self.embedder == embedder && self.dimension == dimension
    }

    /// Each entry's best cosine similarity over all `queries`, in catalog order.
    pub fn best_scores(&self, queries: &[Vec<f32>]) -> Vec<f32> {
        self.entries
            .iter()
            .map(|entry| {
                queries
                    .iter()
                    .map(|q| cosine_similarity(q, &entry.embedding))
                    .fold(f32::MIN, f32::max)
            })
            .collect()
    }

    /// Reads a persisted index; `Ok(None)` when none has been written yet.
    pub async fn load(path: &Path) -> Result<Option<Self>, PortfolioError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PortfolioError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    pub async fn save(&self, path: &Path) -> Result<(), PortfolioError> {
        let io_error = |source| PortfolioError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let content = serde_json::to_string(self)?;
        tokio::fs::write(path, content).await.map_err(io_error)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
