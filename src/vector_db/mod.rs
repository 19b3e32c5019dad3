//! Persistent vector collection keyed by chunk identity
//!
//! `VectorStore` is the storage seam (LanceDB on disk, or in memory for tests and
//! throwaway sessions). `VectorIndex` sits on top of it and owns embedding,
//! sub-batching and statistics.

mod collection;
mod filter;
pub mod lance_client;
mod memory;

pub use collection::VectorIndex;
pub use filter::{FILTER_FIELDS, MetadataFilter};
pub use lance_client::LanceVectorStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{ATTRIBUTE_KEYS, CodeChunk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flattened, string-valued metadata of a stored document. Absent values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub source_file: String,
    pub class_name: String,
    pub method_name: String,
    pub chunk_type: String,
    /// Bulk-delete tag, the archive the chunk came from
    pub archive: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// Every normalizer attribute key, joined with ", " when it was a list
    pub attributes: BTreeMap<String, String>,
}

impl StoredMetadata {
    pub fn from_chunk(chunk: &CodeChunk, archive: Option<&str>) -> Self {
        let attributes = ATTRIBUTE_KEYS
            .iter()
            .map(|key| {
                let value = chunk
                    .metadata
                    .get(*key)
                    .map(|v| v.to_stored())
                    .unwrap_or_default();
                (key.to_string(), value)
            })
            .collect();

        Self {
            source_file: chunk.source_file.clone(),
            class_name: chunk.class_name.clone().unwrap_or_default(),
            method_name: chunk.method_name.clone().unwrap_or_default(),
            chunk_type: chunk.chunk_type.as_str().to_string(),
            archive: archive.unwrap_or_default().to_string(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            content: chunk.content.clone(),
            attributes,
        }
    }

    /// String form of a filterable field
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "source_file" => Some(self.source_file.clone()),
            "class_name" => Some(self.class_name.clone()),
            "method_name" => Some(self.method_name.clone()),
            "chunk_type" => Some(self.chunk_type.clone()),
            "archive" => Some(self.archive.clone()),
            "start_line" => Some(self.start_line.to_string()),
            "end_line" => Some(self.end_line.to_string()),
            "content" => Some(self.content.clone()),
            other => self.attributes.get(other).cloned(),
        }
    }

    /// Flat map of every field, as handed to result consumers
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.attributes.clone();
        map.insert("source_file".into(), self.source_file.clone());
        map.insert("class_name".into(), self.class_name.clone());
        map.insert("method_name".into(), self.method_name.clone());
        map.insert("chunk_type".into(), self.chunk_type.clone());
        map.insert("archive".into(), self.archive.clone());
        map.insert("start_line".into(), self.start_line.to_string());
        map.insert("end_line".into(), self.end_line.to_string());
        map.insert("content".into(), self.content.clone());
        map
    }
}

/// One persisted chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document_text: String,
    pub metadata: StoredMetadata,
}

/// A nearest-neighbor match as returned by a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHit {
    pub id: String,
    pub document_text: String,
    pub metadata: StoredMetadata,
    /// Cosine distance
    pub distance: f64,
}

/// Storage backend for one named collection
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    fn collection_name(&self) -> &str;

    /// Insert or overwrite documents keyed by `id`. Returns the number written.
    async fn upsert(&self, documents: Vec<IndexedDocument>) -> Result<usize>;

    /// Up to `top_k` nearest documents matching `filter`, by ascending cosine distance
    async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredHit>>;

    async fn count(&self) -> Result<usize>;

    /// Metadata of at most `limit` documents, in no particular order
    async fn sample(&self, limit: usize) -> Result<Vec<StoredMetadata>>;

    /// Delete every document whose `field` equals `value`. Returns the number deleted.
    async fn delete_where(&self, field: &str, value: &str) -> Result<usize>;

    /// Drop and recreate the collection; a missing collection is not an error
    async fn reset(&self) -> Result<()>;
}
