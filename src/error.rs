/// Centralized error types for java-rag using thiserror
///
/// Failures local to one declaration or one source unit are recorded in reports;
/// failures at the embedding/storage boundary surface to the caller as `RagError`.
use thiserror::Error;

/// Main error type for the chunking & retrieval core
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source unit could not be turned into a syntax tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Failed to load the Java grammar: {0}")]
    GrammarUnavailable(String),

    #[error("Parser produced no syntax tree for {0}")]
    NoTree(String),

    #[error("No declarations extracted from {0}")]
    EmptyExtraction(String),

    #[error("Source is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// A single declaration could not be normalized into a chunk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Byte span {start}..{end} of {kind} is outside the source text")]
    SpanOutOfBounds {
        kind: String,
        start: usize,
        end: usize,
    },

    #[error("Line {row} of {kind} is outside the source text")]
    LineOutOfBounds { kind: String, row: usize },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to the persistent vector store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to connect to vector store: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create collection '{collection}': {reason}")]
    CollectionCreationFailed { collection: String, reason: String },

    #[error("Failed to open collection '{collection}': {reason}")]
    CollectionUnavailable { collection: String, reason: String },

    #[error("Failed to write documents: {0}")]
    WriteFailed(String),

    #[error("Failed to query collection: {0}")]
    QueryFailed(String),

    #[error("Failed to delete documents: {0}")]
    DeleteFailed(String),

    #[error("Failed to count documents: {0}")]
    CountFailed(String),

    #[error("Malformed stored record: {0}")]
    MalformedRecord(String),

    #[error("Store lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to input validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a sources archive (expected suffix '{suffix}'): {path}")]
    NotSourcesArchive { path: String, suffix: String },

    #[error("Archive cannot be read: {path}: {reason}")]
    UnreadableArchive { path: String, reason: String },

    #[error("Archive contains no Java sources: {0}")]
    NoJavaSources(String),

    #[error("No sources archives found in {0}")]
    NoArchivesFound(String),

    #[error("Unknown filter field '{0}'")]
    UnknownFilterField(String),

    #[error("Filter value for '{field}' must be numeric, got '{value}'")]
    NonNumericFilter { field: String, value: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Result alias used across the crate
pub type Result<T, E = RagError> = std::result::Result<T, E>;

impl RagError {
    /// Check if this is a user error (validation, bad config) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_) | RagError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Failures that only affect one declaration or one source unit
    pub fn is_unit_local(&self) -> bool {
        matches!(self, RagError::Parse(_) | RagError::Extraction(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::Validation(ValidationError::PathNotFound("/test".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: Path does not exist: /test"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let rag_err: RagError = io_err.into();
        assert!(matches!(rag_err, RagError::Io(_)));
    }

    #[test]
    fn test_is_user_error() {
        let user_err = RagError::Validation(ValidationError::UnknownFilterField("x".into()));
        assert!(user_err.is_user_error());

        let system_err = RagError::Storage(StorageError::QueryFailed("down".into()));
        assert!(!system_err.is_user_error());
    }

    #[test]
    fn test_is_unit_local() {
        let parse = RagError::Parse(ParseError::EmptyExtraction("A.java".into()));
        assert!(parse.is_unit_local());

        let embed = RagError::Embedding(EmbeddingError::GenerationFailed("oom".into()));
        assert!(!embed.is_unit_local());
    }

    #[test]
    fn test_extraction_span_message() {
        let err = ExtractionError::SpanOutOfBounds {
            kind: "method_declaration".into(),
            start: 10,
            end: 99,
        };
        assert_eq!(
            err.to_string(),
            "Byte span 10..99 of method_declaration is outside the source text"
        );
    }

    #[test]
    fn test_embedding_count_mismatch() {
        let err = EmbeddingError::CountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Embedding count mismatch: sent 3 texts, got 2 vectors"
        );
    }

    #[test]
    fn test_collection_creation_message() {
        let err = StorageError::CollectionCreationFailed {
            collection: "java_code_chunks".to_string(),
            reason: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create collection 'java_code_chunks': disk full"
        );
    }

    #[test]
    fn test_not_sources_archive_message() {
        let err = ValidationError::NotSourcesArchive {
            path: "lib/guava.jar".into(),
            suffix: "-sources.jar".into(),
        };
        assert_eq!(
            err.to_string(),
            "Not a sources archive (expected suffix '-sources.jar'): lib/guava.jar"
        );
    }

    #[test]
    fn test_error_chain() {
        let storage_err = StorageError::WriteFailed("table locked".to_string());
        let rag_err: RagError = storage_err.into();
        assert!(matches!(rag_err, RagError::Storage(_)));
        assert_eq!(
            rag_err.to_string(),
            "Storage error: Failed to write documents: table locked"
        );
    }
}
