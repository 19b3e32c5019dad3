//! Recursive discovery of archives under a directory

use crate::error::ValidationError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) suffix: String,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            suffix: ".jar".to_string(),
        }
    }

    /// Only keep files whose name ends with `suffix`
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Collect matching files, sorted by path
    pub fn walk(&self) -> Result<Vec<PathBuf>, ValidationError> {
        if !self.root.exists() {
            return Err(ValidationError::PathNotFound(
                self.root.display().to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(ValidationError::NotADirectory(
                self.root.display().to_string(),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", self.root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(&self.suffix));
            if matches {
                files.push(entry.into_path());
            }
        }

        files.sort();
        tracing::debug!(
            "Found {} '*{}' files under {:?}",
            files.len(),
            self.suffix,
            self.root
        );
        Ok(files)
    }
}
