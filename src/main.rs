//! java-rag CLI
//!
//! Usage:
//!   java-rag ingest <PATH> [--reset]     Ingest a sources jar, a directory of them, or a .java file
//!   java-rag search <QUERY> [filters]    Semantic search over ingested chunks
//!   java-rag stats                       Collection statistics
//!   java-rag reset                       Drop every ingested chunk
//!   java-rag remove-archive <NAME>       Drop the chunks of one archive
//!   java-rag validate <DIR>              Check a directory of sources jars

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use java_rag::client::validate_sources_directory;
use java_rag::search::{format_context, summarize_results};
use java_rag::{Config, JavaRagClient, MetadataFilter, SourceUnit};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "java-rag", version, long_version = LONG_VERSION)]
#[command(about = "Semantic chunking and vector search over Java sources")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "JAVA_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a sources jar, a directory of sources jars, or a single .java file
    Ingest {
        path: PathBuf,

        /// Reset the collection before ingesting
        #[arg(long)]
        reset: bool,
    },

    /// Search ingested chunks
    Search {
        query: String,

        /// Number of results (defaults to search.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only return chunks of this type (method, class, interface, field)
        #[arg(long)]
        chunk_type: Option<String>,

        #[arg(long)]
        class_name: Option<String>,

        #[arg(long)]
        source_file: Option<String>,

        /// Only return chunks from this archive
        #[arg(long)]
        archive: Option<String>,

        /// Print numbered context blocks instead of a summary
        #[arg(long)]
        context: bool,
    },

    /// Show collection statistics
    Stats,

    /// Drop and recreate the collection
    Reset,

    /// Delete every chunk ingested from an archive
    RemoveArchive {
        /// Archive file name, e.g. guava-33.0-sources.jar
        name: String,
    },

    /// Validate a directory of sources jars without ingesting it
    Validate { dir: PathBuf },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

async fn ingest(client: &JavaRagClient, path: &Path, reset: bool, json: bool) -> Result<()> {
    if path.is_dir() {
        let report = client.ingest_directory(path, reset).await?;
        if json {
            return print_json(&report);
        }
        println!(
            "Processed {}/{} archives, {} chunks in {} ms",
            report.files_processed, report.files_found, report.total_chunks, report.duration_ms
        );
        if let Some(error) = &report.error {
            println!("Error: {}", error);
        }
        for failed in report.detailed_results.iter().filter(|r| !r.success) {
            println!(
                "  failed: {} ({})",
                failed.jar_file,
                failed.error.as_deref().unwrap_or("unknown error")
            );
        }
        return Ok(());
    }

    if path.extension().is_some_and(|ext| ext == "java") {
        if reset {
            client.reset().await?;
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = client
            .ingest_unit(SourceUnit::new(path.display().to_string(), text))
            .await?;
        if json {
            return print_json(&report);
        }
        match &report.error {
            Some(error) => println!("Failed: {}", error),
            None => println!(
                "Indexed {} chunks from {}",
                report.chunk_count, report.source_file
            ),
        }
        return Ok(());
    }

    let report = client.ingest_archive(path, reset).await?;
    if json {
        return print_json(&report);
    }
    match &report.error {
        Some(error) => println!("Failed: {}", error),
        None => println!(
            "Indexed {} chunks from {} in {} ms",
            report.chunks_processed, report.jar_file, report.duration_ms
        ),
    }
    Ok(())
}

fn validate(dir: &Path, config: &Config, json: bool) -> Result<()> {
    let validation = validate_sources_directory(dir, &config.indexing.archive_suffix);
    if json {
        return print_json(&validation);
    }
    println!(
        "{} sources jars ({} valid, {} invalid) out of {} jars",
        validation.sources_jar_files,
        validation.valid_sources_jars,
        validation.invalid_jars,
        validation.total_jar_files
    );
    if let Some(error) = &validation.error {
        println!("Error: {}", error);
    }
    for recommendation in &validation.recommendations {
        println!("  - {}", recommendation);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let client = match &cli.command {
        Command::Validate { dir } => return validate(dir, &config, cli.json),
        _ => JavaRagClient::with_config(config)
            .await
            .context("Failed to initialize client")?,
    };

    match cli.command {
        Command::Ingest { path, reset } => ingest(&client, &path, reset, cli.json).await?,
        Command::Search {
            query,
            top_k,
            chunk_type,
            class_name,
            source_file,
            archive,
            context,
        } => {
            let filter = MetadataFilter::from_pairs(
                [
                    ("chunk_type", chunk_type),
                    ("class_name", class_name),
                    ("source_file", source_file),
                    ("archive", archive),
                ]
                .into_iter()
                .filter_map(|(field, value)| value.map(|v| (field, v))),
            )?;
            let results = client.search(&query, top_k, &filter).await?;
            if cli.json {
                print_json(&results)?;
            } else if context {
                println!("{}", format_context(&results));
            } else {
                println!("{}", summarize_results(&results));
            }
        }
        Command::Stats => {
            let stats = client.stats().await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("Collection: {}", stats.collection_name);
                println!("Total chunks: {}", stats.total_chunks);
                let note = if stats.is_approximate() {
                    format!(" (sampled from {})", stats.sample_size)
                } else {
                    String::new()
                };
                println!("Chunk types{}:", note);
                for (chunk_type, count) in &stats.chunk_types {
                    println!("  {}: {}", chunk_type, count);
                }
                println!("Unique source files: {}", stats.unique_source_files);
                println!("Unique classes: {}", stats.unique_classes);
            }
        }
        Command::Reset => {
            client.reset().await?;
            println!("Collection '{}' reset", client.index().collection_name());
        }
        Command::RemoveArchive { name } => {
            let deleted = client.remove_archive(&name).await?;
            println!("Deleted {} chunks from {}", deleted, name);
        }
        // Needs no model or store, answered above
        Command::Validate { .. } => {}
    }

    Ok(())
}
