//! Folder and file extraction with strict or lenient failure handling

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{FileType, PageRecord, SkippedFile};

use super::parser::DocumentParser;

/// Pages read from a source plus whatever was skipped on the way
#[derive(Debug, Default)]
pub struct Extraction {
    pub pages: Vec<PageRecord>,
    pub skipped: Vec<SkippedFile>,
    pub files_read: usize,
}

/// Walks a file or directory and parses every supported document
///
/// With `strict` set, the first unreadable file aborts the run. Otherwise it is recorded in
/// [`Extraction::skipped`] and the walk continues. Configuration errors (missing OCR
/// tooling) abort in both modes.
pub struct TextExtractor {
    parser: Arc<DocumentParser>,
    strict: bool,
}

impl TextExtractor {
    pub fn new(parser: Arc<DocumentParser>, strict: bool) -> Self {
        Self { parser, strict }
    }

    pub fn extract(&self, source: &Path) -> Result<Extraction> {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.display().to_string()));
        }

        let files = if source.is_dir() {
            collect_documents(source)
        } else {
            vec![source.to_path_buf()]
        };

        tracing::info!("Extracting {} file(s) from {}", files.len(), source.display());

        let mut extraction = Extraction::default();

        for file in &files {
            match self.parser.parse_file(file) {
                Ok(pages) => {
                    if pages.is_empty() {
                        tracing::warn!("No readable text in {}", file.display());
                    }
                    extraction.files_read += 1;
                    extraction.pages.extend(pages);
                }
                Err(e) if e.is_config() || self.strict => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.display(), e);
                    extraction.skipped.push(SkippedFile {
                        filename: file
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| file.display().to_string()),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if extraction.pages.is_empty() && self.strict {
            return Err(Error::SourceNotFound(format!(
                "No readable pages in {}",
                source.display()
            )));
        }

        tracing::info!(
            "Loaded {} pages from {} file(s), {} skipped",
            extraction.pages.len(),
            extraction.files_read,
            extraction.skipped.len()
        );

        Ok(extraction)
    }
}

/// Supported documents under `dir`, in a stable order
fn collect_documents(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| FileType::from_path(path).is_some())
        .collect()
}
