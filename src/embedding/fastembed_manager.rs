use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based embedding provider, all-MiniLM-L6-v2 by default
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

/// Model names accepted in configuration, with their fastembed model and dimension
const KNOWN_MODELS: [(&str, EmbeddingModel, usize); 4] = [
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Resolve a configured model name (case-insensitive, optional `sentence-transformers/` prefix)
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        let (model, dimension, canonical) = resolve_model(name)?;
        Self::with_model(model, dimension, canonical)
    }

    fn with_model(
        model: EmbeddingModel,
        dimension: usize,
        model_name: &str,
    ) -> Result<Self, EmbeddingError> {
        tracing::info!("Initializing FastEmbed model: {}", model_name);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;
        options.cache_dir = crate::paths::PlatformPaths::default_model_cache_path();

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str), EmbeddingError> {
    let wanted = name
        .trim()
        .trim_start_matches("sentence-transformers/")
        .trim_start_matches("BAAI/");
    KNOWN_MODELS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(wanted))
        .map(|(known, model, dim)| (model.clone(), *dim, *known))
        .ok_or_else(|| EmbeddingError::UnknownModel(name.to_string()))
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
