//! Reading Java sources straight out of `*-sources.jar` archives

use crate::error::ValidationError;
use crate::types::{ArchiveMetadata, SourceUnit, UnitReport};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: u64 = 1 << 20;

/// Units read from an archive, plus entries that could not be decoded
#[derive(Debug, Default)]
pub struct ArchiveContents {
    pub units: Vec<SourceUnit>,
    pub unreadable: Vec<UnitReport>,
}

/// File name of the archive, used as its bulk-delete tag
pub fn archive_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Stable label of one entry: `<archive name>!/<entry path>`
pub fn entry_label(archive: &str, entry: &str) -> String {
    format!("{}!/{}", archive, entry)
}

fn open(path: &Path) -> Result<ZipArchive<File>, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::PathNotFound(path.display().to_string()));
    }
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    ZipArchive::new(file).map_err(|e| unreadable(path, e))
}

fn unreadable(path: &Path, reason: impl std::fmt::Display) -> ValidationError {
    ValidationError::UnreadableArchive {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn is_java_entry(name: &str) -> bool {
    name.ends_with(".java")
}

/// Sorted `.java` entry names
pub fn list_java_entries(path: &Path) -> Result<Vec<String>, ValidationError> {
    let archive = open(path)?;
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| is_java_entry(n))
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}

/// Check that `path` is a readable sources archive with at least one `.java` entry.
///
/// Returns the number of Java entries.
pub fn validate_sources_jar(path: &Path, suffix: &str) -> Result<usize, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::PathNotFound(path.display().to_string()));
    }
    if !archive_label(path).ends_with(suffix) {
        return Err(ValidationError::NotSourcesArchive {
            path: path.display().to_string(),
            suffix: suffix.to_string(),
        });
    }

    let count = list_java_entries(path)?.len();
    if count == 0 {
        return Err(ValidationError::NoJavaSources(path.display().to_string()));
    }
    tracing::debug!("Valid sources archive: {:?} ({} Java files)", path, count);
    Ok(count)
}

/// Size, Java entry count and manifest attributes of an archive
pub fn read_archive_metadata(path: &Path) -> Result<ArchiveMetadata, ValidationError> {
    let size_bytes = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| unreadable(path, e))?;
    let mut archive = open(path)?;
    let java_file_count = archive.file_names().filter(|n| is_java_entry(n)).count();

    let manifest_info = match archive.by_name(MANIFEST_PATH) {
        Ok(mut entry) => {
            let mut text = String::new();
            match entry.read_to_string(&mut text) {
                Ok(_) => parse_manifest(&text),
                Err(e) => {
                    tracing::debug!("Unreadable manifest in {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        }
        Err(ZipError::FileNotFound) => {
            tracing::debug!("No manifest found in {:?}", path);
            BTreeMap::new()
        }
        Err(e) => return Err(unreadable(path, e)),
    };

    Ok(ArchiveMetadata {
        jar_name: archive_label(path),
        jar_path: path.display().to_string(),
        size_bytes,
        java_file_count,
        manifest_info,
    })
}

/// `Key: Value` lines; continuation lines and lines without a colon are ignored
pub fn parse_manifest(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Read every `.java` entry as a source unit tagged with the archive name
pub fn read_java_units(path: &Path) -> Result<ArchiveContents, ValidationError> {
    let mut archive = open(path)?;
    let label = archive_label(path);
    let mut contents = ArchiveContents::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| unreadable(path, e))?;
        if !entry.is_file() || !is_java_entry(entry.name()) {
            continue;
        }
        let source_file = entry_label(&label, entry.name());

        let declared_size = entry.size();
        let bytes = match read_entry(&mut entry, declared_size) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", source_file, e);
                contents
                    .unreadable
                    .push(UnitReport::failed(source_file, e));
                continue;
            }
        };

        match String::from_utf8(bytes) {
            Ok(text) => contents
                .units
                .push(SourceUnit::new(source_file, text).with_archive(label.clone())),
            Err(_) => {
                tracing::warn!("Skipping non UTF-8 entry {}", source_file);
                let reason = crate::error::ParseError::InvalidUtf8(source_file.clone());
                contents
                    .unreadable
                    .push(UnitReport::failed(source_file, reason));
            }
        }
    }

    tracing::debug!(
        "Read {} Java units from {} ({} unreadable)",
        contents.units.len(),
        label,
        contents.unreadable.len()
    );
    Ok(contents)
}

/// Read an entry to the end. The declared size is only a capacity hint and
/// comes from the archive header, so it is capped.
fn read_entry(reader: &mut impl Read, declared_size: u64) -> std::io::Result<Vec<u8>> {
    let hint = usize::try_from(declared_size.min(MAX_PREALLOC)).unwrap_or(0);
    let mut bytes = Vec::with_capacity(hint);
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}


#[cfg(test)]
mod tests {
    use super::test_support::write_jar;
    use super::*;
    use tempfile::TempDir;

    const FOO: &[u8] = b"package demo;\npublic class Foo {\n    void bar() {}\n}\n";

    #[test]
    fn test_labels() {
        let path = Path::new("/libs/demo-1.0-sources.jar");
        assert_eq!(archive_label(path), "demo-1.0-sources.jar");
        assert_eq!(
            entry_label("demo-1.0-sources.jar", "demo/Foo.java"),
            "demo-1.0-sources.jar!/demo/Foo.java"
        );
    }

    #[test]
    fn test_validate_sources_jar() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("demo-sources.jar");
        write_jar(&good, &[("demo/Foo.java", FOO), ("README", b"hi")]);
        assert_eq!(validate_sources_jar(&good, "-sources.jar").unwrap(), 1);

        let binary = dir.path().join("demo.jar");
        write_jar(&binary, &[("demo/Foo.class", b"\xca\xfe")]);
        assert!(matches!(
            validate_sources_jar(&binary, "-sources.jar"),
            Err(ValidationError::NotSourcesArchive { .. })
        ));

        let empty = dir.path().join("empty-sources.jar");
        write_jar(&empty, &[("README", b"hi")]);
        assert!(matches!(
            validate_sources_jar(&empty, "-sources.jar"),
            Err(ValidationError::NoJavaSources(_))
        ));

        let missing = dir.path().join("missing-sources.jar");
        assert!(matches!(
            validate_sources_jar(&missing, "-sources.jar"),
            Err(ValidationError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_archive_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken-sources.jar");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            validate_sources_jar(&path, "-sources.jar"),
            Err(ValidationError::UnreadableArchive { .. })
        ));
    }

    #[test]
    fn test_read_java_units_tags_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo-sources.jar");
        write_jar(
            &path,
            &[
                ("demo/Foo.java", FOO),
                ("demo/Bad.java", b"class Bad { String s = \"\xff\"; }"),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ],
        );

        let contents = read_java_units(&path).unwrap();
        assert_eq!(contents.units.len(), 1);
        let unit = &contents.units[0];
        assert_eq!(unit.source_file, "demo-sources.jar!/demo/Foo.java");
        assert_eq!(unit.archive.as_deref(), Some("demo-sources.jar"));
        assert!(unit.text.contains("class Foo"));

        assert_eq!(contents.unreadable.len(), 1);
        assert_eq!(
            contents.unreadable[0].source_file,
            "demo-sources.jar!/demo/Bad.java"
        );
        assert!(!contents.unreadable[0].success);
    }

    #[test]
    fn test_read_archive_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo-sources.jar");
        write_jar(
            &path,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\nImplementation-Title: demo\r\n"),
                ("demo/A.java", b"class A {}"),
                ("demo/B.java", b"class B {}"),
            ],
        );

        let metadata = read_archive_metadata(&path).unwrap();
        assert_eq!(metadata.jar_name, "demo-sources.jar");
        assert_eq!(metadata.java_file_count, 2);
        assert!(metadata.size_bytes > 0);
        assert_eq!(
            metadata.manifest_info.get("Implementation-Title").map(String::as_str),
            Some("demo")
        );
        assert_eq!(list_java_entries(&path).unwrap(), vec!["demo/A.java", "demo/B.java"]);
    }

    #[test]
    fn test_metadata_without_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo-sources.jar");
        write_jar(&path, &[("demo/A.java", b"class A {}")]);

        let metadata = read_archive_metadata(&path).unwrap();
        assert!(metadata.manifest_info.is_empty());
    }

    #[test]
    fn test_read_entry_ignores_declared_size() {
        let mut reader: &[u8] = b"class A {}";
        let bytes = read_entry(&mut reader, u64::MAX).unwrap();
        assert_eq!(bytes, b"class A {}");
        assert!(bytes.capacity() <= MAX_PREALLOC as usize);
    }

    #[test]
    fn test_forged_entry_size_is_not_trusted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forged-sources.jar");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let stored =
            zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("demo/A.java", stored).unwrap();
        std::io::Write::write_all(&mut zip, b"class A { int x; }").unwrap();
        zip.finish().unwrap();

        // Claim ~4 GiB of uncompressed data in the central directory record
        let mut raw = std::fs::read(&path).unwrap();
        let central = raw
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        raw[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        std::fs::write(&path, &raw).unwrap();

        let contents = read_java_units(&path).unwrap();
        assert_eq!(contents.units.len(), 1);
        assert_eq!(contents.units[0].text, "class A { int x; }");
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse_manifest("Main-Class: a.B\nCreated-By: 17 (Oracle)\n continued\nnoise\n");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest["Created-By"], "17 (Oracle)");
    }
}
