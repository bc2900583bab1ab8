//! Read-only nearest-neighbour index over the resource library.
//!
//! The index is built offline as two index-aligned JSON files: one array of
//! embedding vectors and one array of document metadata. It is loaded once at
//! startup and shared immutably.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A recommendable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub url: String,
}

/// Similarity search collaborator.
pub trait DocumentSearch: Send + Sync {
    /// Return up to `k` documents nearest to `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` does not match the index dimension.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Document>>;
}

/// Exact (flat) L2 index.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    vectors: Vec<Vec<f32>>,
    documents: Vec<Document>,
    dimension: usize,
}

impl DocumentIndex {
    /// Build an index from aligned vectors and metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the lists differ in length or vectors differ in dimension.
    pub fn new(vectors: Vec<Vec<f32>>, documents: Vec<Document>) -> Result<Self> {
        if vectors.len() != documents.len() {
            anyhow::bail!(
                "Index has {} vectors but {} metadata entries",
                vectors.len(),
                documents.len()
            );
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if let Some(pos) = vectors.iter().position(|v| v.len() != dimension) {
            anyhow::bail!(
                "Vector {pos} has dimension {} (expected {dimension})",
                vectors[pos].len()
            );
        }

        Ok(Self {
            vectors,
            documents,
            dimension,
        })
    }

    /// Load the index files written by the offline embedding job.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing, malformed, or they disagree.
    pub fn load(vectors_path: &Path, metadata_path: &Path) -> Result<Self> {
        let vectors: Vec<Vec<f32>> = read_json(vectors_path)?;
        let documents: Vec<Document> = read_json(metadata_path)?;
        let index = Self::new(vectors, documents)?;

        tracing::info!(
            "Loaded {} documents (dim={}) from {}",
            index.len(),
            index.dimension,
            vectors_path.display()
        );
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSearch for DocumentIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Document>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            anyhow::bail!(
                "Query has dimension {} but index has {}",
                query.len(),
                self.dimension
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        // Stable sort keeps index order among equal distances.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.documents[i].clone())
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
