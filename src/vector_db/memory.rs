//! In-memory [`VectorStore`] for tests and throwaway sessions
//!
//! Brute-force cosine distance over every stored vector, behind a `RwLock`.

use super::{IndexedDocument, MetadataFilter, StoredHit, StoredMetadata, VectorStore};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemoryStore {
    collection_name: String,
    documents: RwLock<BTreeMap<String, IndexedDocument>>,
}

impl MemoryStore {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, IndexedDocument>>> {
        self.documents
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, IndexedDocument>>> {
        self.documents
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }

    /// Stored document by id
    pub fn get(&self, id: &str) -> Result<Option<IndexedDocument>> {
        Ok(self.read()?.get(id).cloned())
    }
}

/// `1 - cos(a, b)`; zero vectors are at distance 1
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 1.0;
    }
    1.0 - dot / denom
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn upsert(&self, documents: Vec<IndexedDocument>) -> Result<usize> {
        let count = documents.len();
        let mut stored = self.write()?;
        for doc in documents {
            stored.insert(doc.id.clone(), doc);
        }
        Ok(count)
    }

    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredHit>> {
        let stored = self.read()?;
        let mut hits: Vec<StoredHit> = stored
            .values()
            .filter(|doc| filter.matches(&doc.metadata))
            .map(|doc| StoredHit {
                id: doc.id.clone(),
                document_text: doc.document_text.clone(),
                metadata: doc.metadata.clone(),
                distance: cosine_distance(&embedding, &doc.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn sample(&self, limit: usize) -> Result<Vec<StoredMetadata>> {
        Ok(self
            .read()?
            .values()
            .take(limit)
            .map(|doc| doc.metadata.clone())
            .collect())
    }

    async fn delete_where(&self, field: &str, value: &str) -> Result<usize> {
        let tag = MetadataFilter::new().with(field, value)?;
        if tag.is_empty() {
            return Ok(0);
        }
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|_, doc| !tag.matches(&doc.metadata));
        Ok(before - stored.len())
    }

    async fn reset(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}
