//! Retrieval ranking and result formatting
//!
//! The query is embedded with the same provider used at ingestion, the collection
//! returns its nearest documents, and the ranker turns distances into
//! `similarity = 1 - distance`. Ordering is by ascending distance with the chunk
//! id as tie-break, so it never depends on insertion order.

use crate::error::Result;
use crate::types::SearchResult;
use crate::vector_db::{MetadataFilter, StoredHit, VectorIndex};
use serde::Serialize;
use std::fmt::Write;

/// Characters of code shown per result in [`summarize_results`]
const SUMMARY_CONTENT_CHARS: usize = 500;
/// Results shown in full by [`summarize_results`]
const SUMMARY_TOP_RESULTS: usize = 3;
/// Distinct values kept per field by [`suggest_filters`]
const MAX_SUGGESTIONS: usize = 10;

/// `1 - distance`. Distances above 1 give negative similarity; nothing is clamped.
pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance
}

/// Order hits by (distance, id), keep `top_k`, and assign 1-based ranks
pub fn rank_hits(mut hits: Vec<StoredHit>, top_k: usize) -> Vec<SearchResult> {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_k);

    hits.into_iter()
        .enumerate()
        .map(|(i, hit)| to_search_result(i + 1, hit))
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn to_search_result(rank: usize, hit: StoredHit) -> SearchResult {
    let metadata = hit.metadata.to_map();
    let stored = hit.metadata;
    SearchResult {
        rank,
        id: hit.id,
        content: stored.content,
        source_file: stored.source_file,
        class_name: non_empty(&stored.class_name),
        method_name: non_empty(&stored.method_name),
        chunk_type: stored.chunk_type,
        start_line: stored.start_line,
        end_line: stored.end_line,
        similarity_score: similarity_from_distance(hit.distance),
        metadata,
    }
}

/// Embeds queries and ranks the nearest chunks of one collection
#[derive(Clone)]
pub struct Retriever {
    index: VectorIndex,
}

impl Retriever {
    pub fn new(index: VectorIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Up to `top_k` chunks closest to `query` that satisfy `filter`.
    ///
    /// A blank query or `top_k == 0` returns an empty list without embedding or
    /// touching the store. Storage and embedding failures are returned, never
    /// turned into an empty list.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Searching '{}' (top_k={})", query, top_k);
        let embedding = self
            .index
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let hits = self.index.search(embedding, top_k, filter).await?;
        let results = rank_hits(hits, top_k);
        tracing::debug!("Query returned {} results", results.len());
        Ok(results)
    }
}

/// Numbered result blocks for a downstream prompt
pub fn format_context(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        out.push('\n');
        out.push_str(&"=".repeat(80));
        out.push('\n');
        let _ = write!(
            out,
            "[Chunk {}]\nFile: {}\nClass: {}\nMethod: {}\nType: {}\nLines: {}-{}\nSimilarity: {:.3}\n\nCode:\n{}\n",
            i + 1,
            result.source_file,
            result.class_name.as_deref().unwrap_or("-"),
            result.method_name.as_deref().unwrap_or("-"),
            result.chunk_type,
            result.start_line,
            result.end_line,
            result.similarity_score,
            result.content
        );
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plain-text answer listing the top results, used when no language model is involved
pub fn summarize_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No relevant code found for your query.".to_string();
    }

    let mut out = format!(
        "Found {} relevant code chunks for your query:\n",
        results.len()
    );
    for (i, result) in results.iter().take(SUMMARY_TOP_RESULTS).enumerate() {
        let name = result
            .method_name
            .as_deref()
            .or(result.class_name.as_deref())
            .unwrap_or("(anonymous)");
        let mut code: String = result.content.chars().take(SUMMARY_CONTENT_CHARS).collect();
        if result.content.chars().count() > SUMMARY_CONTENT_CHARS {
            code.push_str("...");
        }

        let _ = write!(
            out,
            "\n{}. {}: {}\n   - File: {}\n   - Lines: {}-{}\n   - Similarity: {:.3}\n\n```java\n{}\n```\n",
            i + 1,
            capitalize(&result.chunk_type),
            name,
            result.source_file,
            result.start_line,
            result.end_line,
            result.similarity_score,
            code
        );
    }

    if results.len() > SUMMARY_TOP_RESULTS {
        let _ = write!(
            out,
            "\n... and {} more relevant chunks.\n",
            results.len() - SUMMARY_TOP_RESULTS
        );
    }
    out
}

/// Distinct filter values seen in a result list, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSuggestions {
    pub class_names: Vec<String>,
    pub chunk_types: Vec<String>,
    pub source_files: Vec<String>,
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && values.len() < MAX_SUGGESTIONS && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Propose up to 10 class names, chunk types and source files to narrow a search
pub fn suggest_filters(results: &[SearchResult]) -> FilterSuggestions {
    let mut suggestions = FilterSuggestions::default();
    for result in results {
        if let Some(class_name) = &result.class_name {
            push_distinct(&mut suggestions.class_names, class_name);
        }
        push_distinct(&mut suggestions.chunk_types, &result.chunk_type);
        push_distinct(&mut suggestions.source_files, &result.source_file);
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::types::{ChunkMetadata, ChunkType, CodeChunk};
    use crate::vector_db::{MemoryStore, StoredMetadata};
    use std::sync::Arc;

    fn hit(id: &str, distance: f64, class_name: &str, method_name: &str) -> StoredHit {
        StoredHit {
            id: id.to_string(),
            document_text: String::new(),
            metadata: StoredMetadata {
                source_file: format!("{}.java", class_name),
                class_name: class_name.to_string(),
                method_name: method_name.to_string(),
                chunk_type: if method_name.is_empty() { "class" } else { "method" }.to_string(),
                start_line: 1,
                end_line: 4,
                content: "code".to_string(),
                ..StoredMetadata::default()
            },
            distance,
        }
    }

    fn chunk(class_name: &str, method: &str, content: &str, chunk_type: ChunkType) -> CodeChunk {
        CodeChunk {
            content: content.to_string(),
            source_file: format!("{}.java", class_name),
            class_name: Some(class_name.to_string()),
            method_name: Some(method.to_string()),
            start_line: 1,
            end_line: 3,
            chunk_type,
            metadata: ChunkMetadata::new(),
        }
    }

    #[test]
    fn test_similarity_conversion() {
        assert!((similarity_from_distance(0.2) - 0.8).abs() < 1e-12);
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert!(similarity_from_distance(1.5) < 0.0);
    }

    #[test]
    fn test_rank_hits_orders_by_distance_then_id() {
        let ranked = rank_hits(
            vec![
                hit("c", 0.5, "C", "run"),
                hit("b", 0.1, "B", "run"),
                hit("a", 0.1, "A", "run"),
            ],
            10,
        );

        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!((ranked[2].similarity_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rank_hits_truncates() {
        let ranked = rank_hits(
            vec![hit("a", 0.1, "A", "x"), hit("b", 0.2, "B", "y")],
            1,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn test_empty_names_become_none() {
        let ranked = rank_hits(vec![hit("a", 0.2, "A", "")], 5);
        assert_eq!(ranked[0].class_name.as_deref(), Some("A"));
        assert_eq!(ranked[0].method_name, None);
        assert_eq!(ranked[0].metadata["method_name"], "");
        assert!((ranked[0].similarity_score - 0.8).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_retriever_respects_filter() {
        let index = VectorIndex::new(
            Arc::new(MemoryStore::new("c")),
            Arc::new(HashingEmbedder::new(64)),
        );
        index
            .add_chunks(
                &[
                    chunk("Account", "deposit", "void deposit(long amount) {}", ChunkType::Method),
                    chunk("Account", "balance", "long balance;", ChunkType::Field),
                    chunk("Ledger", "deposit", "void deposit(Entry e) {}", ChunkType::Method),
                ],
                None,
            )
            .await
            .unwrap();

        let retriever = Retriever::new(index);
        let methods = MetadataFilter::new().with("chunk_type", "method").unwrap();
        let results = retriever.search("deposit amount", 10, &methods).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk_type == "method"));
        assert!(results[0].similarity_score >= results[1].similarity_score);
    }

    #[tokio::test]
    async fn test_retriever_blank_query_is_empty() {
        let retriever = Retriever::new(VectorIndex::new(
            Arc::new(MemoryStore::new("c")),
            Arc::new(HashingEmbedder::new(8)),
        ));
        assert!(retriever
            .search("  ", 5, &MetadataFilter::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_format_context() {
        let results = rank_hits(vec![hit("a", 0.25, "Account", "deposit")], 5);
        let context = format_context(&results);

        assert!(context.contains("[Chunk 1]"));
        assert!(context.contains("File: Account.java"));
        assert!(context.contains("Method: deposit"));
        assert!(context.contains("Lines: 1-4"));
        assert!(context.contains("Similarity: 0.750"));
        assert!(context.contains("Code:\ncode"));
    }

    #[test]
    fn test_summarize_results() {
        assert_eq!(
            summarize_results(&[]),
            "No relevant code found for your query."
        );

        let results = rank_hits(
            (0..5)
                .map(|i| hit(&format!("h{}", i), 0.1 * i as f64, "Account", "deposit"))
                .collect(),
            5,
        );
        let summary = summarize_results(&results);
        assert!(summary.starts_with("Found 5 relevant code chunks"));
        assert!(summary.contains("1. Method: deposit"));
        assert!(summary.contains("3. Method"));
        assert!(!summary.contains("4. Method"));
        assert!(summary.contains("... and 2 more relevant chunks."));
    }

    #[test]
    fn test_summarize_truncates_long_content() {
        let mut long = hit("a", 0.0, "A", "");
        long.metadata.content = "x".repeat(600);
        let summary = summarize_results(&rank_hits(vec![long], 1));
        assert!(summary.contains(&format!("{}...", "x".repeat(500))));
        assert!(summary.contains("1. Class: A"));
    }

    #[test]
    fn test_suggest_filters_distinct_and_bounded() {
        let mut hits: Vec<StoredHit> = (0..15)
            .map(|i| hit(&format!("h{}", i), 0.0, &format!("C{}", i), "m"))
            .collect();
        hits.push(hit("dup", 0.0, "C0", ""));
        let results = rank_hits(hits, 100);

        let suggestions = suggest_filters(&results);
        assert_eq!(suggestions.class_names.len(), 10);
        assert_eq!(suggestions.source_files.len(), 10);
        // "dup" sorts first among equal distances
        assert_eq!(suggestions.chunk_types, vec!["class", "method"]);
    }
}
