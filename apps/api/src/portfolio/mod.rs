//! Portfolio Matcher — finds the portfolio links most relevant to a skill set.
//!
//! The catalog is a CSV with `Techstack` and `Links` columns. It is embedded
//! once into a `VectorIndex` persisted under the vectorstore directory;
//! `ensure_loaded` is the only way the index gets populated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PortfolioConfig;

pub mod embedding;
pub mod index;

pub use embedding::{ApiEmbedder, Embedder, HashingEmbedder};
pub use index::VectorIndex;

const TECH_STACK_COLUMN: &str = "Techstack";
const LINKS_COLUMN: &str = "Links";

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Portfolio index has not been initialized")]
    NotInitialized,

    #[error("Portfolio CSV is missing the '{0}' column")]
    MissingColumn(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vector store is corrupt: {0}")]
    Store(#[from] serde_json::Error),

    #[error("Embedding failed: {0}")]
    Embedding(String),
}

/// One past project: its technology stack and where to see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioEntry {
    pub tech_stack: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Techstack")]
    tech_stack: Option<String>,
    #[serde(rename = "Links")]
    link: Option<String>,
}

/// Reads the catalog. Rows with a blank `Techstack` or `Links` are skipped
/// with a warning; a missing column fails the whole load.
pub async fn load_catalog(path: &Path) -> Result<Vec<PortfolioEntry>, PortfolioError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PortfolioError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<Vec<PortfolioEntry>, PortfolioError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    for column in [TECH_STACK_COLUMN, LINKS_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(PortfolioError::MissingColumn(column));
        }
    }

    let mut entries = Vec::new();
    for (idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = row?;
        let tech_stack = row.tech_stack.unwrap_or_default();
        let link = row.link.unwrap_or_default();

        if tech_stack.is_empty() || link.is_empty() {
            warn!("Skipping portfolio row at line {}: missing Techstack or Links", line);
            continue;
        }

        entries.push(PortfolioEntry { tech_stack, link });
    }

    Ok(entries)
}

pub struct Portfolio {
    csv_path: PathBuf,
    store_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    index: Option<VectorIndex>,
}

impl Portfolio {
    pub fn new(config: &PortfolioConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            csv_path: config.csv_path.clone(),
            store_path: config.vectorstore_dir.join(index::STORE_FILE),
            embedder,
            index: None,
        }
    }

    /// Number of indexed entries; zero before initialization.
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, VectorIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Populates the index if it is empty and returns how many entries were
    /// added. A no-op returning 0 when the index (in memory or persisted by
    /// a previous run with the same embedder) already has entries.
    pub async fn ensure_loaded(&mut self) -> Result<usize, PortfolioError> {
        if self.index.as_ref().is_some_and(|index| !index.is_empty()) {
            return Ok(0);
        }

        let name = self.embedder.name().to_string();
        let dimension = self.embedder.dimension();

        match VectorIndex::load(&self.store_path).await? {
            Some(stored) if !stored.is_empty() && stored.is_compatible(&name, dimension) => {
                info!(
                    "Loaded {} portfolio entries from {}",
                    stored.len(),
                    self.store_path.display()
                );
                self.index = Some(stored);
                return Ok(0);
            }
            Some(stored) if !stored.is_empty() => {
                warn!(
                    "Vector store was built with {} ({}d); rebuilding with {} ({}d)",
                    stored.embedder, stored.dimension, name, dimension
                );
            }
            _ => {}
        }

        let catalog = load_catalog(&self.csv_path).await?;
        let documents: Vec<String> = catalog.iter().map(|e| e.tech_stack.clone()).collect();
        let vectors = self.embedder.embed(&documents).await?;
        if vectors.len() != catalog.len() {
            return Err(PortfolioError::Embedding(format!(
                "expected {} vectors, got {}",
                catalog.len(),
                vectors.len()
            )));
        }

        let mut index = VectorIndex::new(&name, dimension);
        for (entry, vector) in catalog.into_iter().zip(vectors) {
            index.add(entry.tech_stack, entry.link, vector);
        }
        index.save(&self.store_path).await?;

        let added = index.len();
        info!(
            "Indexed {} portfolio entries from {}",
            added,
            self.csv_path.display()
        );
        self.index = Some(index);
        Ok(added)
    }

    /// Returns up to `limit` distinct links whose tech stack is most similar
    /// to any of `skills`, best first. Entries scoring at or below the
    /// embedder's minimum are left out.
    pub async fn query_links(
        &self,
        skills: &[String],
        limit: usize,
    ) -> Result<Vec<String>, PortfolioError> {
        let index = self.index.as_ref().ok_or(PortfolioError::NotInitialized)?;

        let queries: Vec<String> = skills
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if queries.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(&queries).await?;
        let scores = index.best_scores(&vectors);
        let min_score = self.embedder.min_score();

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > min_score)
            .collect();
        // Stable sort keeps catalog order among equal scores.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut links: Vec<String> = Vec::with_capacity(limit);
        for (idx, _) in ranked {
            let link = &index.entries[idx].link;
            if !links.contains(link) {
                links.push(link.clone());
            }
            if links.len() == limit {
                break;
            }
        }

        Ok(links)
    }
}
