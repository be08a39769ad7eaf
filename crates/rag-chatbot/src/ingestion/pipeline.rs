//! Ingestion pipeline orchestration
//!
//! extract -> chunk -> embed -> upsert, all within one call. Parsing and OCR run on the
//! blocking pool.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embeddings::EmbeddingGenerator;
use crate::error::{Error, Result};
use crate::retrieval::VectorStoreClient;
use crate::types::IngestSummary;

use super::chunker::TextChunker;
use super::extractor::{Extraction, TextExtractor};
use super::parser::DocumentParser;

/// One file received over HTTP
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// Main ingestion pipeline
pub struct IngestPipeline {
    parser: Arc<DocumentParser>,
    chunker: TextChunker,
    embeddings: Arc<EmbeddingGenerator>,
    store: Arc<VectorStoreClient>,
}

impl IngestPipeline {
    pub fn new(
        parser: Arc<DocumentParser>,
        chunker: TextChunker,
        embeddings: Arc<EmbeddingGenerator>,
        store: Arc<VectorStoreClient>,
    ) -> Self {
        Self {
            parser,
            chunker,
            embeddings,
            store,
        }
    }

    /// Ingest a file or folder readable by this process
    pub async fn ingest_path(&self, path: impl Into<PathBuf>, strict: bool) -> Result<IngestSummary> {
        let path = path.into();
        tracing::info!("Ingesting {} ({} mode)", path.display(), if strict { "strict" } else { "lenient" });

        let extraction = self.extract(path, strict).await?;
        self.store_extraction(extraction).await
    }

    /// Ingest uploaded blobs; unreadable files are skipped and reported
    pub async fn ingest_uploads(&self, files: Vec<UploadedFile>) -> Result<IngestSummary> {
        if files.is_empty() {
            return Err(Error::InvalidRequest("No files uploaded".to_string()));
        }

        let staging = tempfile::Builder::new().prefix("rag-upload-").tempdir()?;
        let dir = staging.path().to_path_buf();
        tracing::info!("Staging {} uploaded file(s)", files.len());

        tokio::task::spawn_blocking(move || write_uploads(&dir, &files))
            .await
            .map_err(|e| Error::internal(format!("Upload staging task failed: {}", e)))??;

        let extraction = self.extract(staging.path().to_path_buf(), false).await?;
        let summary = self.store_extraction(extraction).await;

        drop(staging);
        summary
    }

    async fn extract(&self, path: PathBuf, strict: bool) -> Result<Extraction> {
        let extractor = TextExtractor::new(Arc::clone(&self.parser), strict);
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))?
    }

    async fn store_extraction(&self, extraction: Extraction) -> Result<IngestSummary> {
        let chunks = self.chunker.split(&extraction.pages);
        let embedded = self.embeddings.embed(&chunks).await?;
        let vectors_stored = self.store.upsert(&embedded).await?;

        let summary = IngestSummary {
            documents_processed: extraction.pages.len(),
            chunks_created: chunks.len(),
            vectors_stored,
            files_skipped: extraction.skipped,
        };

        tracing::info!(
            "Ingested {} pages into {} chunks, {} vectors stored, {} file(s) skipped",
            summary.documents_processed,
            summary.chunks_created,
            summary.vectors_stored,
            summary.files_skipped.len()
        );

        Ok(summary)
    }
}

/// Final path component only, so uploads cannot escape the staging directory
fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

fn write_uploads(dir: &Path, files: &[UploadedFile]) -> Result<()> {
    for (i, file) in files.iter().enumerate() {
        let name = sanitize_filename(&file.filename).unwrap_or_else(|| format!("upload-{}.bin", i));
        let mut target = dir.join(&name);
        if target.exists() {
            target = dir.join(format!("{}-{}", i, name));
        }
        std::fs::write(&target, &file.data)?;
        tracing::debug!("Staged {} ({} bytes)", name, file.data.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, EmbeddingConfig, OcrConfig};
    use crate::ingestion::ocr::OcrEngine;
    use crate::testing::{KeywordEmbedder, RecordingIndex};

    fn pipeline(index: Arc<RecordingIndex>) -> IngestPipeline {
        let parser = DocumentParser::new(OcrEngine::new(&OcrConfig {
            poppler_path: Some(PathBuf::from("/nonexistent/poppler/bin")),
            tesseract_cmd: "/nonexistent/tesseract".to_string(),
            ..OcrConfig::default()
        }));
        let embeddings = EmbeddingGenerator::new(
            Arc::new(KeywordEmbedder::new(16)),
            &EmbeddingConfig {
                dimensions: 16,
                ..EmbeddingConfig::default()
            },
        );
        IngestPipeline::new(
            Arc::new(parser),
            TextChunker::new(&ChunkingConfig::default()).unwrap(),
            Arc::new(embeddings),
            Arc::new(VectorStoreClient::new(index, "docs", 100)),
        )
    }

    fn upload(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert!(sanitize_filename("..").is_none());
        assert!(sanitize_filename("dir/").is_none());
    }

    #[tokio::test]
    async fn test_uploads_are_stored_and_bad_files_skipped() {
        let index = Arc::new(RecordingIndex::default());
        let summary = pipeline(index.clone())
            .ingest_uploads(vec![
                upload("refunds.txt", b"Refunds take five business days."),
                upload("broken.pdf", b"not really a pdf"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.documents_processed, 1);
        assert_eq!(summary.chunks_created, 1);
        assert_eq!(summary.vectors_stored, 1);
        assert_eq!(summary.files_skipped.len(), 1);
        assert_eq!(summary.files_skipped[0].filename, "broken.pdf");
        assert_eq!(index.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_uploads_is_invalid() {
        let err = pipeline(Arc::new(RecordingIndex::default()))
            .ingest_uploads(Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_only_blank_content_means_nothing_to_embed() {
        let index = Arc::new(RecordingIndex::default());
        let err = pipeline(index.clone())
            .ingest_uploads(vec![upload("blank.txt", b"   \n ")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoChunksToEmbed));
        assert_eq!(index.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_folder_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let page = "The warranty covers parts and labour for two years. ".repeat(30);
        std::fs::write(dir.path().join("warranty.txt"), &page).unwrap();
        std::fs::write(dir.path().join("faq.md"), "Shipping is free over $50.").unwrap();

        let index = Arc::new(RecordingIndex::default());
        let summary = pipeline(index.clone()).ingest_path(dir.path(), true).await.unwrap();

        assert_eq!(summary.documents_processed, 2);
        assert!(summary.chunks_created >= 3);
        assert_eq!(summary.vectors_stored, summary.chunks_created);
        assert!(summary.files_skipped.is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let err = pipeline(Arc::new(RecordingIndex::default()))
            .ingest_path("/no/such/folder", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }
}
