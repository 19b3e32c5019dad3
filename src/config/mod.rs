/// Configuration system for java-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage writes per call never exceed this
pub const MAX_UPSERT_BATCH: usize = 100;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Vector database configuration
    pub vector_db: VectorDbConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// Indexing configuration
    pub indexing: IndexingConfig,

    /// Search configuration
    pub search: SearchConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Database backend: "lancedb" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Collection name for vector storage
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: "fastembed" or "hashing"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Vector dimension of the hashing provider
    #[serde(default = "default_hashing_dimension")]
    pub dimension: usize,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Documents per storage write (1..=100)
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,

    /// File name suffix identifying source archives
    #[serde(default = "default_archive_suffix")]
    pub archive_suffix: String,

    /// Documents sampled for per-type statistics
    #[serde(default = "default_stats_sample_size")]
    pub stats_sample_size: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

// Default value functions
fn default_db_backend() -> String {
    "lancedb".to_string()
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_collection_name() -> String {
    "java_code_chunks".to_string()
}

fn default_provider() -> String {
    "fastembed".to_string()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_hashing_dimension() -> usize {
    384
}

fn default_upsert_batch_size() -> usize {
    MAX_UPSERT_BATCH
}

fn default_archive_suffix() -> String {
    "-sources.jar".to_string()
}

fn default_stats_sample_size() -> usize {
    100
}

fn default_top_k() -> usize {
    5
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            lancedb_path: default_lancedb_path(),
            collection_name: default_collection_name(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_name: default_model_name(),
            dimension: default_hashing_dimension(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: default_upsert_batch_size(),
            archive_suffix: default_archive_suffix(),
            stats_sample_size: default_stats_sample_size(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if !matches!(self.vector_db.backend.as_str(), "lancedb" | "memory") {
            return Err(invalid(
                "vector_db.backend",
                format!(
                    "must be 'lancedb' or 'memory', got '{}'",
                    self.vector_db.backend
                ),
            ));
        }

        if self.vector_db.collection_name.trim().is_empty() {
            return Err(invalid("vector_db.collection_name", "must not be empty"));
        }

        if !matches!(self.embedding.provider.as_str(), "fastembed" | "hashing") {
            return Err(invalid(
                "embedding.provider",
                format!(
                    "must be 'fastembed' or 'hashing', got '{}'",
                    self.embedding.provider
                ),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension", "must be greater than 0"));
        }

        if !(1..=MAX_UPSERT_BATCH).contains(&self.indexing.upsert_batch_size) {
            return Err(invalid(
                "indexing.upsert_batch_size",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_UPSERT_BATCH, self.indexing.upsert_batch_size
                ),
            ));
        }

        if self.indexing.archive_suffix.is_empty() {
            return Err(invalid("indexing.archive_suffix", "must not be empty"));
        }

        if self.indexing.stats_sample_size == 0 {
            return Err(invalid("indexing.stats_sample_size", "must be greater than 0"));
        }

        if self.search.top_k == 0 {
            return Err(invalid("search.top_k", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `JAVA_RAG_*` overrides read through `lookup`; empty and unparsable values are ignored
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("JAVA_RAG_DB_BACKEND") {
            self.vector_db.backend = backend;
        }

        if let Some(path) = get("JAVA_RAG_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Some(collection) = get("JAVA_RAG_COLLECTION") {
            self.vector_db.collection_name = collection;
        }

        if let Some(provider) = get("JAVA_RAG_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(model) = get("JAVA_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Some(batch_size) = get("JAVA_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.trim().parse()
        {
            self.indexing.upsert_batch_size = size;
        }

        if let Some(top_k) = get("JAVA_RAG_TOP_K")
            && let Ok(k) = top_k.trim().parse()
        {
            self.search.top_k = k;
        }
    }

    /// Load from an explicit file, or the default location, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        Self::load(None)
    }
}
