//! Page and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, OCR fallback for pages without a text layer
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text or markdown
    Txt,
    /// Raster image, OCR only
    Image,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" | "markdown" => Some(Self::Txt),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document",
            Self::Txt => "Text",
            Self::Image => "Image",
        }
    }
}

/// One readable page of a source document
///
/// `text` is always trimmed and non-empty; the extractor drops anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub text: String,
    pub source_filename: String,
    /// 1-indexed
    pub page_number: u32,
    /// Local path or URL the page came from
    pub source_path: String,
    pub category: Option<String>,
}

impl PageRecord {
    /// Build a record, returning `None` when the text is blank
    pub fn new(
        text: &str,
        source_filename: impl Into<String>,
        page_number: u32,
        source_path: impl Into<String>,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            source_filename: source_filename.into(),
            page_number,
            source_path: source_path.into(),
            category: None,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Source metadata every chunk of this page inherits
    pub fn chunk_metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            filename: self.source_filename.clone(),
            page_number: self.page_number,
            source_path: self.source_path.clone(),
            category: self.category.clone(),
        }
    }
}

/// Source metadata copied from the originating page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub page_number: u32,
    pub source_path: String,
    pub category: Option<String>,
}

/// A bounded span of page text ready for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Txt));
        assert_eq!(FileType::from_extension("jpeg"), Some(FileType::Image));
        assert_eq!(FileType::from_extension("xlsx"), None);
        assert_eq!(
            FileType::from_path(Path::new("/docs/handbook.docx")),
            Some(FileType::Docx)
        );
        assert_eq!(FileType::from_path(Path::new("/docs/README")), None);
    }

    #[test]
    fn test_blank_page_rejected() {
        assert!(PageRecord::new("  \n\t ", "a.pdf", 1, "/tmp/a.pdf").is_none());

        let page = PageRecord::new("  Hello  ", "a.pdf", 2, "/tmp/a.pdf").unwrap();
        assert_eq!(page.text, "Hello");
        assert_eq!(page.chunk_metadata().page_number, 2);
    }
}
