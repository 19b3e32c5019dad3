use super::ast_parser::{SourceText, SyntaxNode};
use super::normalizer::normalize;
use crate::error::ExtractionError;
use crate::types::{ChunkType, CodeChunk};
use serde::Serialize;

/// A declaration node selected for chunking
#[derive(Debug, Clone)]
pub struct Candidate<N> {
    pub node: N,
    pub chunk_type: ChunkType,
}

/// A declaration that was dropped during normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionFailure {
    pub node_kind: String,
    /// 1-based
    pub start_line: usize,
    pub reason: String,
}

/// Chunks extracted from one tree, plus the declarations that were dropped
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub chunks: Vec<CodeChunk>,
    pub failures: Vec<ExtractionFailure>,
}

/// Depth-first, pre-order walk emitting every declaration node in document order.
///
/// Every child of every node is visited, so a class and the methods inside it
/// are all emitted.
pub fn collect_candidates<N: SyntaxNode>(root: N) -> Vec<Candidate<N>> {
    let mut candidates = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(chunk_type) = ChunkType::from_node_kind(node.kind()) {
            candidates.push(Candidate {
                node: node.clone(),
                chunk_type,
            });
        }
        let mut children = node.children();
        children.reverse();
        stack.extend(children);
    }

    candidates
}

/// Walk the tree and normalize every declaration into a chunk.
///
/// A declaration that fails to normalize is logged and dropped; its siblings are
/// still extracted.
pub fn extract<N: SyntaxNode>(root: N, source: &SourceText<'_>, source_file: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for candidate in collect_candidates(root) {
        match normalize(&candidate.node, candidate.chunk_type, source, source_file) {
            Ok(chunk) => extraction.chunks.push(chunk),
            Err(e) => {
                let failure = failure_for(&candidate.node, e);
                tracing::warn!(
                    "Dropped {} at {}:{}: {}",
                    failure.node_kind,
                    source_file,
                    failure.start_line,
                    failure.reason
                );
                extraction.failures.push(failure);
            }
        }
    }

    extraction
}

fn failure_for<N: SyntaxNode>(node: &N, error: ExtractionError) -> ExtractionFailure {
    ExtractionFailure {
        node_kind: node.kind().to_string(),
        start_line: node.start_row() + 1,
        reason: error.to_string(),
    }
}
