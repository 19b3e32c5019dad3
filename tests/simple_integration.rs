/// End-to-end tests over the public API, using the offline hashing provider
use anyhow::Result;
use java_rag::embedding::HashingEmbedder;
use java_rag::indexer::{JavaParser, chunk_id, extract_unit};
use java_rag::vector_db::{MemoryStore, VectorStore};
use java_rag::{ChunkType, Config, JavaRagClient, MetadataFilter, SourceUnit};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const INVENTORY: &str = r#"package shop;

import java.util.Map;

/**
 * Stock levels per SKU.
 */
public class Inventory implements Iterable<String> {
    private final Map<String, Integer> stock;

    public Inventory(Map<String, Integer> stock) {
        this.stock = stock;
    }

    public int available(String sku) {
        return stock.getOrDefault(sku, 0);
    }

    @Deprecated
    public static void restock(Inventory inventory, String sku, int amount) {
        inventory.stock.merge(sku, amount, Integer::sum);
    }
}
"#;

const PRICING: &str = r#"package shop;

public interface Pricing extends Comparable<Pricing> {
    long priceOf(String sku);
}
"#;

fn memory_config() -> Config {
    let mut config = Config::default();
    config.vector_db.backend = "memory".to_string();
    config.embedding.provider = "hashing".to_string();
    config.embedding.dimension = 96;
    config
}

fn lancedb_config(dir: &TempDir) -> Config {
    let mut config = memory_config();
    config.vector_db.backend = "lancedb".to_string();
    config.vector_db.lancedb_path = dir.path().join("lancedb");
    config
}

fn write_jar(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let mut zip = ZipWriter::new(std::fs::File::create(path)?);
    for (name, text) in entries {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(text.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

#[test]
fn test_extraction_yields_each_declaration_once() -> Result<()> {
    let mut parser = JavaParser::new()?;
    let unit = SourceUnit::new("shop/Inventory.java", INVENTORY);
    let extraction = extract_unit(&mut parser, &unit)?;

    // Constructors are not chunked
    let kinds: Vec<ChunkType> = extraction.chunks.iter().map(|c| c.chunk_type).collect();
    assert_eq!(
        kinds,
        vec![
            ChunkType::Class,
            ChunkType::Field,
            ChunkType::Method,
            ChunkType::Method
        ]
    );

    let class = &extraction.chunks[0];
    assert_eq!(class.class_name.as_deref(), Some("Inventory"));
    assert_eq!(class.end_line, class.start_line + 10);

    let restock = &extraction.chunks[3];
    assert_eq!(restock.method_name.as_deref(), Some("restock"));
    assert_eq!(restock.class_name.as_deref(), Some("Inventory"));
    Ok(())
}

#[test]
fn test_identities_are_deterministic() -> Result<()> {
    let unit = SourceUnit::new("shop/Inventory.java", INVENTORY);
    let first = extract_unit(&mut JavaParser::new()?, &unit)?;
    let second = extract_unit(&mut JavaParser::new()?, &unit)?;

    let ids = |chunks: &[java_rag::CodeChunk]| chunks.iter().map(chunk_id).collect::<Vec<_>>();
    assert_eq!(ids(&first.chunks), ids(&second.chunks));
    Ok(())
}

#[tokio::test]
async fn test_reingestion_does_not_duplicate() -> Result<()> {
    let store = Arc::new(MemoryStore::new("java_code_chunks"));
    let client = JavaRagClient::with_components(
        memory_config(),
        store.clone(),
        Arc::new(HashingEmbedder::new(96)),
    );
    let unit = SourceUnit::new("shop/Inventory.java", INVENTORY);

    client.ingest_unit(unit.clone()).await?;
    let after_first = store.count().await?;
    client.ingest_unit(unit).await?;

    assert_eq!(after_first, 4);
    assert_eq!(store.count().await?, after_first);
    Ok(())
}

#[tokio::test]
async fn test_filtered_search_only_returns_matching_type() -> Result<()> {
    let client = JavaRagClient::with_config(memory_config()).await?;
    client
        .ingest_units(vec![
            SourceUnit::new("shop/Inventory.java", INVENTORY),
            SourceUnit::new("shop/Pricing.java", PRICING),
        ])
        .await?;

    for chunk_type in ["method", "class", "interface", "field"] {
        let filter = MetadataFilter::new().with("chunk_type", chunk_type)?;
        let results = client.search("stock sku price", Some(20), &filter).await?;
        assert!(!results.is_empty(), "no {} results", chunk_type);
        assert!(results.iter().all(|r| r.chunk_type == chunk_type));
    }

    let unfiltered = client
        .search("stock sku price", Some(20), &MetadataFilter::new())
        .await?;
    assert_eq!(unfiltered.len(), 6);
    assert!(
        unfiltered
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score)
    );
    Ok(())
}

#[test]
fn test_unknown_filter_field_is_rejected() {
    assert!(MetadataFilter::new().with("language", "java").is_err());
}

#[tokio::test]
async fn test_lancedb_archive_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let jar = dir.path().join("shop-1.2-sources.jar");
    write_jar(
        &jar,
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\nBundle-Name: shop\n"),
            ("shop/Inventory.java", INVENTORY),
            ("shop/Pricing.java", PRICING),
        ],
    )?;

    let client = JavaRagClient::with_config(lancedb_config(&dir)).await?;
    let report = client.ingest_archive(&jar, true).await?;
    assert!(report.success);
    assert_eq!(report.chunks_processed, 6);

    let filter = MetadataFilter::from_pairs([
        ("archive", "shop-1.2-sources.jar"),
        ("chunk_type", "method"),
    ])?;
    let results = client.search("restock amount", Some(10), &filter).await?;
    assert_eq!(results.len(), 3);
    assert!(
        results
            .iter()
            .all(|r| r.source_file.starts_with("shop-1.2-sources.jar!/"))
    );

    let stats = client.stats().await?;
    assert_eq!(stats.total_chunks, 6);
    assert_eq!(stats.unique_source_files, 2);

    // A second process sees the same collection
    let reopened = JavaRagClient::with_config(lancedb_config(&dir)).await?;
    assert_eq!(reopened.stats().await?.total_chunks, 6);

    assert_eq!(client.remove_archive("shop-1.2-sources.jar").await?, 6);
    assert!(!client.status().await?.ready_for_queries);
    Ok(())
}

#[tokio::test]
async fn test_reset_is_idempotent_on_fresh_database() -> Result<()> {
    let dir = TempDir::new()?;
    let client = JavaRagClient::with_config(lancedb_config(&dir)).await?;
    client.reset().await?;
    client.reset().await?;
    assert_eq!(client.stats().await?.total_chunks, 0);
    Ok(())
}
