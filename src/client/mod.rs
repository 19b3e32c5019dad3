//! Core library client for java-rag
//!
//! `JavaRagClient` wires configuration, the embedding provider and the vector
//! store together, and exposes ingestion, search and collection maintenance.

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, provider_from_config};
use crate::error::{ConfigError, Result};
use crate::search::Retriever;
use crate::types::{CollectionStats, IngestionStatus, SearchResult};
use crate::vector_db::{LanceVectorStore, MemoryStore, MetadataFilter, VectorIndex, VectorStore};
use std::sync::Arc;

/// Main client for ingesting Java sources and querying them
///
/// # Example
///
/// ```no_run
/// use java_rag::{Config, JavaRagClient, MetadataFilter};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = JavaRagClient::with_config(Config::default()).await?;
///
///     let report = client
///         .ingest_archive(std::path::Path::new("lib/guava-33.0-sources.jar"), false)
///         .await?;
///     println!("Indexed {} chunks", report.chunks_processed);
///
///     let filter = MetadataFilter::new().with("chunk_type", "method")?;
///     for result in client.search("immutable list builder", None, &filter).await? {
///         println!("{:.3} {}", result.similarity_score, result.source_file);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct JavaRagClient {
    pub(crate) config: Arc<Config>,
    pub(crate) index: VectorIndex,
    pub(crate) retriever: Retriever,
}

impl JavaRagClient {
    /// Create a client from the default configuration file and environment
    pub async fn new() -> Result<Self> {
        Self::with_config(Config::new()?).await
    }

    /// Create a client with an explicit configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!("Initializing java-rag client");
        tracing::debug!("Vector DB backend: {}", config.vector_db.backend);
        tracing::debug!(
            "Embedding provider: {} ({})",
            config.embedding.provider,
            config.embedding.model_name
        );

        let embedder = provider_from_config(&config.embedding)?;
        let store: Arc<dyn VectorStore> = match config.vector_db.backend.as_str() {
            "lancedb" => {
                let path = config.vector_db.lancedb_path.to_string_lossy().to_string();
                tracing::info!("Using LanceDB vector database at {}", path);
                Arc::new(
                    LanceVectorStore::open(
                        &path,
                        &config.vector_db.collection_name,
                        embedder.dimension(),
                    )
                    .await?,
                )
            }
            "memory" => {
                tracing::info!("Using in-memory vector store");
                Arc::new(MemoryStore::new(config.vector_db.collection_name.clone()))
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "vector_db.backend".to_string(),
                    reason: format!("unknown backend '{}'", other),
                }
                .into());
            }
        };

        Ok(Self::with_components(config, store, embedder))
    }

    /// Assemble a client from an already-built store and provider
    pub fn with_components(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let index = VectorIndex::new(store, embedder)
            .with_batch_size(config.indexing.upsert_batch_size)
            .with_sample_size(config.indexing.stats_sample_size);
        Self {
            config: Arc::new(config),
            retriever: Retriever::new(index.clone()),
            index,
        }
    }

    /// Semantic search. `top_k` falls back to the configured default.
    ///
    /// A query that is empty or only whitespace matches nothing and returns an
    /// empty list.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        let top_k = top_k.unwrap_or(self.config.search.top_k);
        self.retriever.search(query, top_k, filter).await
    }

    /// Collection statistics (per-type breakdown is sampled)
    pub async fn stats(&self) -> Result<CollectionStats> {
        self.index.stats().await
    }

    /// Statistics plus whether anything can be queried yet
    pub async fn status(&self) -> Result<IngestionStatus> {
        let stats = self.index.stats().await?;
        Ok(IngestionStatus {
            collection_name: stats.collection_name,
            ready_for_queries: stats.total_chunks > 0,
            total_chunks: stats.total_chunks,
            chunk_types: stats.chunk_types,
            unique_source_files: stats.unique_source_files,
            unique_classes: stats.unique_classes,
        })
    }

    /// Drop every indexed chunk
    pub async fn reset(&self) -> Result<()> {
        self.index.reset().await
    }

    /// Delete every chunk ingested from the named archive
    pub async fn remove_archive(&self, archive_name: &str) -> Result<usize> {
        self.index.delete_by_tag("archive", archive_name).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embedding_dimension(&self) -> usize {
        self.index.embedder().dimension()
    }
}

// Ingestion orchestration
mod ingestion;

pub use ingestion::validate_sources_directory;
