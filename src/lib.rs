//! # java-rag - semantic chunking and retrieval over Java sources
//!
//! Java source units (loose `.java` files or entries of `*-sources.jar` archives)
//! are parsed with tree-sitter. Every method, class, interface and field
//! declaration becomes a `CodeChunk` with normalized metadata and a deterministic
//! UUIDv5 identity. Chunks are embedded and upserted into a persistent vector
//! collection that supports metadata-filtered nearest-neighbor search.
//!
//! ## Architecture
//!
//! ```text
//! source unit ──► JavaParser ──► visitor ──► normalizer ──► composer
//!                                                             │
//!                                              EmbeddingProvider (FastEmbed)
//!                                                             │
//!                           Retriever ◄── VectorIndex ◄── VectorStore (LanceDB)
//! ```
//!
//! ## Modules
//!
//! - [`indexer`]: parsing, declaration extraction, identity, document composition, archives
//! - [`embedding`]: embedding generation using FastEmbed, plus an offline hashing provider
//! - [`vector_db`]: vector store abstraction (LanceDB and in-memory) and the collection facade
//! - [`search`]: ranking and result formatting
//! - [`client`]: ingestion orchestration and the query facade
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: chunk, result and report records
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform data and config directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use java_rag::{JavaRagClient, MetadataFilter, SourceUnit};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = JavaRagClient::new().await?;
//!
//!     let report = client
//!         .ingest_unit(SourceUnit::new("Hello.java", "class Hello { void hi() {} }"))
//!         .await?;
//!     println!("{} chunks", report.chunk_count);
//!
//!     for hit in client.search("greeting", Some(3), &MetadataFilter::new()).await? {
//!         println!("{:.3} {:?}", hit.similarity_score, hit.method_name);
//!     }
//!     Ok(())
//! }
//! ```

/// Ingestion orchestration and the query facade
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Java parsing, chunk extraction and archive reading
pub mod indexer;

/// Platform-specific data and config directories
pub mod paths;

/// Retrieval ranking and result formatting
pub mod search;

/// Chunk, result and report records
pub mod types;

/// Vector store abstraction and the collection facade
pub mod vector_db;

pub use client::JavaRagClient;
pub use config::Config;
pub use error::{RagError, Result};
pub use types::{ChunkType, CodeChunk, SearchResult, SourceUnit};
pub use vector_db::MetadataFilter;
