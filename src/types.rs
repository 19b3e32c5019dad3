use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Metadata key: modifiers from the fixed vocabulary
pub const MODIFIERS: &str = "modifiers";
/// Metadata key: verbatim formal parameter texts
pub const PARAMETERS: &str = "parameters";
/// Metadata key: method return type
pub const RETURN_TYPE: &str = "return_type";
/// Metadata key: verbatim annotation texts
pub const ANNOTATIONS: &str = "annotations";
/// Metadata key: superclass (class) or extended interfaces (interface)
pub const EXTENDS: &str = "extends";
/// Metadata key: implemented interfaces
pub const IMPLEMENTS: &str = "implements";
/// Metadata key: declared type of a field
pub const FIELD_TYPE: &str = "field_type";

/// Every attribute key the normalizer can emit
pub const ATTRIBUTE_KEYS: [&str; 7] = [
    MODIFIERS,
    PARAMETERS,
    RETURN_TYPE,
    ANNOTATIONS,
    EXTENDS,
    IMPLEMENTS,
    FIELD_TYPE,
];

/// Kind of declaration a chunk was cut from (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Method,
    Class,
    Interface,
    Field,
}

impl ChunkType {
    pub const ALL: [ChunkType; 4] = [
        ChunkType::Method,
        ChunkType::Class,
        ChunkType::Interface,
        ChunkType::Field,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Method => "method",
            ChunkType::Class => "class",
            ChunkType::Interface => "interface",
            ChunkType::Field => "field",
        }
    }

    /// Map a tree-sitter-java node kind to the chunk type it produces
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "method_declaration" => Some(ChunkType::Method),
            "class_declaration" => Some(ChunkType::Class),
            "interface_declaration" => Some(ChunkType::Interface),
            "field_declaration" => Some(ChunkType::Field),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "method" => Ok(ChunkType::Method),
            "class" => Ok(ChunkType::Class),
            "interface" => Ok(ChunkType::Interface),
            "field" => Ok(ChunkType::Field),
            other => Err(format!("unknown chunk type '{}'", other)),
        }
    }
}

/// A metadata value: a scalar or an ordered sequence of scalars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Scalar(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Storage form: sequences are joined with ", "
    pub fn to_stored(&self) -> String {
        match self {
            MetadataValue::Scalar(s) => s.clone(),
            MetadataValue::List(items) => items.join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MetadataValue::Scalar(s) => s.is_empty(),
            MetadataValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        MetadataValue::List(value)
    }
}

/// Derived chunk metadata. Keys that do not apply to a chunk type are absent.
pub type ChunkMetadata = BTreeMap<String, MetadataValue>;

/// The atomic retrievable unit: one declaration of a Java source unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Verbatim source text (header only for classes)
    pub content: String,
    /// Stable label of the originating source unit
    pub source_file: String,
    /// Declared type name, or enclosing class for methods and fields
    pub class_name: Option<String>,
    /// Method or field name
    pub method_name: Option<String>,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive (start_line + 10 for classes)
    pub end_line: usize,
    pub chunk_type: ChunkType,
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Number of source lines the chunk claims to span
    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Raw source text paired with its stable label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub source_file: String,
    pub text: String,
    /// Archive tag used for bulk deletion
    #[serde(default)]
    pub archive: Option<String>,
}

impl SourceUnit {
    pub fn new(source_file: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            text: text.into(),
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }
}

/// A single ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based position in the ranking
    pub rank: usize,
    pub id: String,
    pub content: String,
    pub source_file: String,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub chunk_type: String,
    pub start_line: usize,
    pub end_line: usize,
    /// 1 - distance; not clamped
    pub similarity_score: f64,
    /// Flattened stored metadata
    pub metadata: BTreeMap<String, String>,
}

/// Collection statistics. Per-type and uniqueness counts come from a bounded sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection_name: String,
    pub total_chunks: usize,
    pub chunk_types: BTreeMap<String, usize>,
    pub unique_source_files: usize,
    pub unique_classes: usize,
    /// Number of documents the breakdown was computed from
    pub sample_size: usize,
}

impl CollectionStats {
    /// True when the breakdown does not cover the whole collection
    pub fn is_approximate(&self) -> bool {
        self.sample_size < self.total_chunks
    }
}

/// Aggregate statistics over a set of extracted chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStatistics {
    pub total_chunks: usize,
    pub chunk_types: BTreeMap<String, usize>,
    pub unique_classes: usize,
    pub unique_source_files: usize,
    pub total_lines_of_code: usize,
    pub average_chunk_size: f64,
}

impl ChunkStatistics {
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a CodeChunk>) -> Self {
        let mut stats = ChunkStatistics::default();
        let mut classes = BTreeSet::new();
        let mut files = BTreeSet::new();

        for chunk in chunks {
            stats.total_chunks += 1;
            *stats
                .chunk_types
                .entry(chunk.chunk_type.as_str().to_string())
                .or_insert(0) += 1;
            if let Some(class_name) = &chunk.class_name {
                classes.insert(class_name.clone());
            }
            files.insert(chunk.source_file.clone());
            stats.total_lines_of_code += chunk.line_span();
        }

        stats.unique_classes = classes.len();
        stats.unique_source_files = files.len();
        if stats.total_chunks > 0 {
            stats.average_chunk_size = stats.total_lines_of_code as f64 / stats.total_chunks as f64;
        }
        stats
    }
}

/// Outcome of ingesting one source unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub source_file: String,
    pub success: bool,
    pub chunk_count: usize,
    /// Declarations dropped during normalization
    #[serde(default)]
    pub failed_declarations: usize,
    /// The tree contained error nodes; extraction was best effort
    #[serde(default)]
    pub had_syntax_errors: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl UnitReport {
    pub fn failed(source_file: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            source_file: source_file.into(),
            success: false,
            chunk_count: 0,
            failed_declarations: 0,
            had_syntax_errors: false,
            error: Some(error.to_string()),
        }
    }

    /// Succeeded, but some declarations were dropped
    pub fn is_partial(&self) -> bool {
        self.success && self.failed_declarations > 0
    }
}

/// Outcome of ingesting a list of source units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub success: bool,
    pub units_processed: usize,
    pub units_failed: usize,
    pub chunks_indexed: usize,
    pub duration_ms: u64,
    pub units: Vec<UnitReport>,
    pub chunk_statistics: ChunkStatistics,
}

/// Metadata read from a sources archive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub jar_name: String,
    pub jar_path: String,
    pub size_bytes: u64,
    pub java_file_count: usize,
    pub manifest_info: BTreeMap<String, String>,
}

/// Outcome of ingesting one sources archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub success: bool,
    pub jar_file: String,
    pub chunks_processed: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub jar_metadata: Option<ArchiveMetadata>,
    #[serde(default)]
    pub chunk_statistics: Option<ChunkStatistics>,
    #[serde(default)]
    pub units: Vec<UnitReport>,
}

impl ArchiveReport {
    pub fn failed(jar_file: impl Into<String>, error: impl fmt::Display, duration_ms: u64) -> Self {
        Self {
            success: false,
            jar_file: jar_file.into(),
            chunks_processed: 0,
            duration_ms,
            error: Some(error.to_string()),
            jar_metadata: None,
            chunk_statistics: None,
            units: Vec::new(),
        }
    }
}

/// Outcome of ingesting every sources archive under a directory, or a list of archives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub success: bool,
    pub directory: Option<String>,
    pub files_found: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_chunks: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    pub detailed_results: Vec<ArchiveReport>,
}

/// Readiness of the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub collection_name: String,
    pub total_chunks: usize,
    pub chunk_types: BTreeMap<String, usize>,
    pub unique_source_files: usize,
    pub unique_classes: usize,
    pub ready_for_queries: bool,
}

/// Pre-flight check of a directory of archives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryValidation {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub total_jar_files: usize,
    pub sources_jar_files: usize,
    pub valid_sources_jars: usize,
    pub invalid_jars: usize,
    pub recommendations: Vec<String>,
    pub valid_jar_files: Vec<String>,
    pub invalid_jar_files: Vec<String>,
}
