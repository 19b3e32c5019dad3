use super::{IndexedDocument, MetadataFilter, StoredHit, StoredMetadata, VectorStore};
use crate::config::MAX_UPSERT_BATCH;
use crate::embedding::{EmbeddingProvider, check_batch};
use crate::error::{EmbeddingError, Result};
use crate::indexer::{chunk_id, compose_document};
use crate::types::{CodeChunk, CollectionStats};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

const DEFAULT_SAMPLE_SIZE: usize = 100;

/// A named vector collection: embeds composed documents and writes them in bounded sub-batches
#[derive(Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    sample_size: usize,
}

/// A chunk ready to embed
struct PendingDocument {
    id: String,
    document_text: String,
    metadata: StoredMetadata,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            batch_size: MAX_UPSERT_BATCH,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Documents per storage write, clamped to `1..=100`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_UPSERT_BATCH);
        self
    }

    /// Documents read to compute the per-type breakdown in [`stats`](Self::stats)
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn collection_name(&self) -> &str {
        self.store.collection_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Compose, embed and upsert chunks. `archive` becomes the bulk-delete tag.
    ///
    /// An embedding failure aborts the current sub-batch and is returned; sub-batches
    /// written before it stay written. Returns the number of documents written.
    pub async fn add_chunks(&self, chunks: &[CodeChunk], archive: Option<&str>) -> Result<usize> {
        let pending = dedupe_last(
            chunks
                .iter()
                .map(|chunk| PendingDocument {
                    id: chunk_id(chunk),
                    document_text: compose_document(chunk),
                    metadata: StoredMetadata::from_chunk(chunk, archive),
                })
                .collect(),
            |doc| doc.id.as_str(),
        );

        let total_batches = pending.len().div_ceil(self.batch_size);
        let mut written = 0;

        for (batch_idx, batch) in pending.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|d| d.document_text.clone()).collect();
            let embeddings = self.embed(texts).await?;

            let documents = batch
                .iter()
                .zip(embeddings)
                .map(|(doc, embedding)| IndexedDocument {
                    id: doc.id.clone(),
                    embedding,
                    document_text: doc.document_text.clone(),
                    metadata: doc.metadata.clone(),
                })
                .collect();

            written += self.store.upsert(documents).await?;
            tracing::debug!(
                "Wrote batch {}/{} ({} documents) to '{}'",
                batch_idx + 1,
                total_batches,
                batch.len(),
                self.collection_name()
            );
        }

        Ok(written)
    }

    /// Upsert already-embedded documents in sub-batches of at most `batch_size`
    pub async fn upsert(&self, documents: Vec<IndexedDocument>) -> Result<usize> {
        let documents = dedupe_last(documents, |doc| doc.id.as_str());
        let mut written = 0;
        for batch in documents.chunks(self.batch_size) {
            written += self.store.upsert(batch.to_vec()).await?;
        }
        Ok(written)
    }

    /// Embed texts on the blocking pool and check the provider's output shape
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.clone();
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(texts))
            .await
            .map_err(|e| EmbeddingError::GenerationFailed(format!("Embedding task panicked: {}", e)))??;

        check_batch(&vectors, expected, self.embedder.dimension())?;
        Ok(vectors)
    }

    /// Nearest documents to `embedding`, ascending distance
    pub async fn search(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredHit>> {
        self.store.query(embedding, top_k, filter).await
    }

    /// Exact total plus a breakdown computed from at most `sample_size` documents
    pub async fn stats(&self) -> Result<CollectionStats> {
        let total_chunks = self.store.count().await?;
        let sample = self.store.sample(self.sample_size).await?;

        let mut chunk_types = BTreeMap::new();
        let mut source_files = BTreeSet::new();
        let mut classes = BTreeSet::new();
        for metadata in &sample {
            *chunk_types.entry(metadata.chunk_type.clone()).or_insert(0) += 1;
            source_files.insert(metadata.source_file.as_str());
            if !metadata.class_name.is_empty() {
                classes.insert(metadata.class_name.as_str());
            }
        }

        Ok(CollectionStats {
            collection_name: self.collection_name().to_string(),
            total_chunks,
            chunk_types,
            unique_source_files: source_files.len(),
            unique_classes: classes.len(),
            sample_size: sample.len(),
        })
    }

    /// Drop and recreate the collection
    pub async fn reset(&self) -> Result<()> {
        tracing::info!("Resetting collection '{}'", self.collection_name());
        self.store.reset().await
    }

    /// Delete every document whose `field` equals `value`
    pub async fn delete_by_tag(&self, field: &str, value: &str) -> Result<usize> {
        let deleted = self.store.delete_where(field, value).await?;
        tracing::info!(
            "Deleted {} documents with {} = '{}' from '{}'",
            deleted,
            field,
            value,
            self.collection_name()
        );
        Ok(deleted)
    }
}

/// Keep the last occurrence of each key, in order of those last occurrences
fn dedupe_last<T>(items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items.into_iter().rev() {
        if seen.insert(key(&item).to_string()) {
            kept.push(item);
        }
    }
    kept.reverse();
    kept
}
