use super::JavaRagClient;
use crate::error::{Result, ValidationError};
use crate::indexer::archive::{
    ArchiveContents, archive_label, read_archive_metadata, read_java_units, validate_sources_jar,
};
use crate::indexer::{FileWalker, extract_units};
use crate::types::{
    ArchiveReport, BatchReport, ChunkStatistics, CodeChunk, DirectoryReport, DirectoryValidation,
    SourceUnit, UnitReport,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Valid archives listed in a validation report
const LISTED_VALID: usize = 10;
/// Invalid archives listed in a validation report
const LISTED_INVALID: usize = 5;

impl JavaRagClient {
    /// Ingest a single source unit
    ///
    /// Parse and extraction problems are reported in the returned record; embedding
    /// and storage failures are returned as errors.
    pub async fn ingest_unit(&self, unit: SourceUnit) -> Result<UnitReport> {
        let source_file = unit.source_file.clone();
        let mut report = self.ingest_units(vec![unit]).await?;
        Ok(report
            .units
            .pop()
            .unwrap_or_else(|| UnitReport::failed(source_file, "unit was not processed")))
    }

    /// Ingest a list of source units. One unit failing does not stop the others.
    pub async fn ingest_units(&self, units: Vec<SourceUnit>) -> Result<BatchReport> {
        let start = Instant::now();
        let total = units.len();
        let names: Vec<String> = units.iter().map(|u| u.source_file.clone()).collect();

        let extractions = tokio::task::spawn_blocking(move || extract_units(&units))
            .await
            .map_err(std::io::Error::other)?;

        let mut reports = Vec::with_capacity(total);
        // Grouped by archive tag so each group is one `add_chunks` call
        let mut by_archive: BTreeMap<Option<String>, Vec<CodeChunk>> = BTreeMap::new();

        for (source_file, extraction) in names.into_iter().zip(extractions) {
            match extraction {
                Ok(extraction) => {
                    if !extraction.failures.is_empty() {
                        tracing::warn!(
                            "{}: {} declarations dropped",
                            source_file,
                            extraction.failures.len()
                        );
                    }
                    reports.push(UnitReport {
                        source_file,
                        success: true,
                        chunk_count: extraction.chunks.len(),
                        failed_declarations: extraction.failures.len(),
                        had_syntax_errors: extraction.had_syntax_errors,
                        error: None,
                    });
                    by_archive
                        .entry(extraction.archive)
                        .or_default()
                        .extend(extraction.chunks);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", source_file, e);
                    reports.push(UnitReport::failed(source_file, e));
                }
            }
        }

        let chunk_statistics = ChunkStatistics::from_chunks(by_archive.values().flatten());
        let mut chunks_indexed = 0;
        for (archive, chunks) in &by_archive {
            chunks_indexed += self.index.add_chunks(chunks, archive.as_deref()).await?;
        }

        let units_failed = reports.iter().filter(|r| !r.success).count();
        let units_processed = total - units_failed;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Ingested {}/{} units ({} chunks) in {} ms",
            units_processed,
            total,
            chunks_indexed,
            duration_ms
        );

        Ok(BatchReport {
            success: total == 0 || units_processed > 0,
            units_processed,
            units_failed,
            chunks_indexed,
            duration_ms,
            units: reports,
            chunk_statistics,
        })
    }

    /// Ingest one `*-sources.jar`, optionally resetting the collection first.
    ///
    /// An invalid or empty archive gives a failed report, not an error.
    pub async fn ingest_archive(&self, jar_path: &Path, reset: bool) -> Result<ArchiveReport> {
        tracing::info!("Starting ingestion of archive: {}", jar_path.display());
        let start = Instant::now();
        let jar_file = jar_path.display().to_string();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        if let Err(e) = validate_sources_jar(jar_path, &self.config.indexing.archive_suffix) {
            tracing::error!("Invalid archive {}: {}", jar_file, e);
            return Ok(ArchiveReport::failed(jar_file, e, elapsed(start)));
        }

        if reset {
            self.reset().await?;
        }

        let path = jar_path.to_path_buf();
        let read = tokio::task::spawn_blocking(move || {
            read_archive_metadata(&path).and_then(|meta| Ok((meta, read_java_units(&path)?)))
        })
        .await
        .map_err(std::io::Error::other)?;

        let (jar_metadata, ArchiveContents { units, unreadable }) = match read {
            Ok(read) => read,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", jar_file, e);
                return Ok(ArchiveReport::failed(jar_file, e, elapsed(start)));
            }
        };

        let batch = self.ingest_units(units).await?;
        let mut unit_reports = unreadable;
        unit_reports.extend(batch.units);

        if batch.chunks_indexed == 0 {
            tracing::error!("No code chunks extracted from {}", jar_file);
            let mut report = ArchiveReport::failed(
                jar_file,
                "No code chunks extracted from archive",
                elapsed(start),
            );
            report.jar_metadata = Some(jar_metadata);
            report.units = unit_reports;
            return Ok(report);
        }

        let duration_ms = elapsed(start);
        tracing::info!(
            "Successfully ingested {} chunks from {} in {} ms",
            batch.chunks_indexed,
            jar_metadata.jar_name,
            duration_ms
        );

        Ok(ArchiveReport {
            success: true,
            jar_file,
            chunks_processed: batch.chunks_indexed,
            duration_ms,
            error: None,
            jar_metadata: Some(jar_metadata),
            chunk_statistics: Some(batch.chunk_statistics),
            units: unit_reports,
        })
    }

    /// Ingest every sources archive found under `dir`
    pub async fn ingest_directory(&self, dir: &Path, reset: bool) -> Result<DirectoryReport> {
        tracing::info!("Starting ingestion of archive directory: {}", dir.display());
        let start = Instant::now();
        let directory = Some(dir.display().to_string());

        let walker = FileWalker::new(dir).with_suffix(self.config.indexing.archive_suffix.clone());
        let jar_files = match walker.walk() {
            Ok(files) if files.is_empty() => {
                let error = ValidationError::NoArchivesFound(dir.display().to_string());
                return Ok(empty_run(directory, error.to_string()));
            }
            Ok(files) => files,
            Err(e) => return Ok(empty_run(directory, e.to_string())),
        };

        tracing::info!("Found {} archives to process", jar_files.len());
        if reset {
            self.reset().await?;
        }

        let mut report = self.ingest_each(&jar_files).await?;
        report.directory = directory;
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Ingest a list of archives; invalid ones are reported and skipped
    pub async fn ingest_archives(&self, jar_paths: &[PathBuf], reset: bool) -> Result<DirectoryReport> {
        tracing::info!("Starting batch ingestion of {} archives", jar_paths.len());
        let start = Instant::now();
        if reset {
            self.reset().await?;
        }
        let mut report = self.ingest_each(jar_paths).await?;
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn ingest_each(&self, jar_files: &[PathBuf]) -> Result<DirectoryReport> {
        let mut detailed_results = Vec::with_capacity(jar_files.len());
        for (i, jar_file) in jar_files.iter().enumerate() {
            tracing::info!(
                "Processing archive {}/{}: {}",
                i + 1,
                jar_files.len(),
                archive_label(jar_file)
            );
            let result = self.ingest_archive(jar_file, false).await?;
            if let Some(error) = &result.error {
                tracing::error!("Failed to process {}: {}", result.jar_file, error);
            }
            detailed_results.push(result);
        }

        let files_processed = detailed_results.iter().filter(|r| r.success).count();
        let total_chunks = detailed_results.iter().map(|r| r.chunks_processed).sum();
        Ok(DirectoryReport {
            success: files_processed > 0,
            directory: None,
            files_found: jar_files.len(),
            files_processed,
            files_failed: jar_files.len() - files_processed,
            total_chunks,
            duration_ms: 0,
            error: None,
            detailed_results,
        })
    }

    /// Check a directory of archives before ingesting it
    pub fn validate_sources_directory(&self, dir: &Path) -> DirectoryValidation {
        validate_sources_directory(dir, &self.config.indexing.archive_suffix)
    }
}

/// Count and check the archives under `dir` without ingesting anything
pub fn validate_sources_directory(dir: &Path, suffix: &str) -> DirectoryValidation {
    let invalid_dir = |error: String, recommendation: &str| DirectoryValidation {
        valid: false,
        error: Some(error),
        total_jar_files: 0,
        sources_jar_files: 0,
        valid_sources_jars: 0,
        invalid_jars: 0,
        recommendations: vec![recommendation.to_string()],
        valid_jar_files: Vec::new(),
        invalid_jar_files: Vec::new(),
    };

    let all_jars = match FileWalker::new(dir).walk() {
        Ok(files) => files,
        Err(e @ ValidationError::NotADirectory(_)) => {
            return invalid_dir(e.to_string(), "Provide a valid directory path");
        }
        Err(e) => return invalid_dir(e.to_string(), "Create the directory and add JAR files"),
    };
    let sources_jars: Vec<&PathBuf> = all_jars
        .iter()
        .filter(|p| archive_label(p).ends_with(suffix))
        .collect();

    let mut recommendations = Vec::new();
    if sources_jars.is_empty() {
        if all_jars.is_empty() {
            recommendations.push("No JAR files found in directory".to_string());
            recommendations.push("Add JAR files with source code to this directory".to_string());
        } else {
            recommendations.push(format!(
                "Found {} JAR files, but none are sources JARs ({})",
                all_jars.len(),
                suffix
            ));
            recommendations.push("Ensure you have the source versions of your dependencies".to_string());
        }
    }

    let (valid, invalid): (Vec<&PathBuf>, Vec<&PathBuf>) = sources_jars
        .iter()
        .copied()
        .partition(|p| validate_sources_jar(p, suffix).is_ok());
    if !invalid.is_empty() {
        recommendations.push(format!("Found {} invalid JAR files", invalid.len()));
    }

    let listed = |paths: &[&PathBuf], n: usize| -> Vec<String> {
        paths.iter().take(n).map(|p| p.display().to_string()).collect()
    };

    DirectoryValidation {
        valid: !valid.is_empty(),
        error: None,
        total_jar_files: all_jars.len(),
        sources_jar_files: sources_jars.len(),
        valid_sources_jars: valid.len(),
        invalid_jars: invalid.len(),
        recommendations,
        valid_jar_files: listed(&valid, LISTED_VALID),
        invalid_jar_files: listed(&invalid, LISTED_INVALID),
    }
}

fn empty_run(directory: Option<String>, error: String) -> DirectoryReport {
    tracing::error!("{}", error);
    DirectoryReport {
        success: false,
        directory,
        files_found: 0,
        files_processed: 0,
        files_failed: 0,
        total_chunks: 0,
        duration_ms: 0,
        error: Some(error),
        detailed_results: Vec::new(),
    }
}
