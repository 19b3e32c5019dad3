//! Java source chunking, archive reading and archive discovery
//!
//! Source text is parsed with tree-sitter, walked by the visitor, and every
//! method, class, interface and field declaration becomes a `CodeChunk` with a
//! deterministic identity and a composed document text.

pub mod archive;
mod ast_parser;
mod composer;
mod file_walker;
mod identity;
mod normalizer;
mod visitor;

pub use ast_parser::{JavaParser, SourceText, SyntaxNode};
pub use composer::compose_document;
pub use file_walker::FileWalker;
pub use identity::{CHUNK_NAMESPACE, chunk_id, identity_key};
pub use normalizer::{CLASS_SPAN_LINES, MODIFIER_VOCABULARY, normalize};
pub use visitor::{Candidate, Extraction, ExtractionFailure, collect_candidates, extract};

use crate::error::ParseError;
use crate::types::{CodeChunk, SourceUnit};
use rayon::prelude::*;

/// Chunks of one source unit
#[derive(Debug, Clone)]
pub struct UnitExtraction {
    pub source_file: String,
    pub archive: Option<String>,
    pub chunks: Vec<CodeChunk>,
    pub failures: Vec<ExtractionFailure>,
    pub had_syntax_errors: bool,
}

/// Parse one unit and extract its chunks.
///
/// A unit that yields no chunks at all is a parse failure; dropped declarations
/// alongside surviving chunks are a partial success.
pub fn extract_unit(
    parser: &mut JavaParser,
    unit: &SourceUnit,
) -> Result<UnitExtraction, ParseError> {
    let tree = parser.parse(&unit.text, &unit.source_file)?;
    let root = tree.root_node();
    let had_syntax_errors = SyntaxNode::has_error(&root);
    if had_syntax_errors {
        tracing::debug!("{} has syntax errors, extracting best effort", unit.source_file);
    }

    let source = SourceText::new(&unit.text);
    let Extraction { chunks, failures } = extract(root, &source, &unit.source_file);

    if chunks.is_empty() {
        return Err(ParseError::EmptyExtraction(unit.source_file.clone()));
    }

    Ok(UnitExtraction {
        source_file: unit.source_file.clone(),
        archive: unit.archive.clone(),
        chunks,
        failures,
        had_syntax_errors,
    })
}

/// Extract many units in parallel. Results keep the input order.
pub fn extract_units(units: &[SourceUnit]) -> Vec<Result<UnitExtraction, ParseError>> {
    units
        .par_iter()
        .map_init(JavaParser::new, |parser, unit| match parser {
            Ok(parser) => extract_unit(parser, unit),
            Err(e) => Err(e.clone()),
        })
        .collect()
}
