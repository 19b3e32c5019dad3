mod fastembed_manager;
mod hashing;

pub use fastembed_manager::FastEmbedManager;
pub use hashing::HashingEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::{ConfigError, EmbeddingError, RagError};
use std::sync::Arc;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text, one vector per input in input order
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the provider selected by configuration
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match config.provider.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedManager::from_model_name(&config.model_name)?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        other => Err(ConfigError::InvalidValue {
            key: "embedding.provider".to_string(),
            reason: format!("unknown provider '{}'", other),
        }
        .into()),
    }
}

/// Check the provider kept its contract for one batch
pub(crate) fn check_batch(
    vectors: &[Vec<f32>],
    expected: usize,
    dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}
