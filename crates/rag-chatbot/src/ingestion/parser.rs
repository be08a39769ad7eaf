//! Per-format page extraction

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{FileType, PageRecord};

use super::ocr::OcrEngine;

/// Category recorded on pages that came from raster images
pub const IMAGE_CATEGORY: &str = "Image";

/// Replace typographic glyphs PDF fonts commonly emit with plain equivalents
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    collapse_blank_lines(&text)
}

/// Trim trailing spaces and keep at most one blank line between paragraphs
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Reads one file into page records
pub struct DocumentParser {
    ocr: OcrEngine,
}

impl DocumentParser {
    pub fn new(ocr: OcrEngine) -> Self {
        Self { ocr }
    }

    /// Parse a file by extension. Blank pages are dropped, so the result may be empty.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<PageRecord>> {
        let file_type = FileType::from_path(path).ok_or_else(|| {
            Error::UnsupportedFileType(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = path.display().to_string();

        tracing::debug!("Parsing {} as {}", source, file_type.display_name());

        match file_type {
            FileType::Pdf => self.parse_pdf(path, &filename, &source),
            FileType::Txt => Self::parse_text(path, &filename, &source),
            FileType::Docx => Self::parse_docx(path, &filename, &source),
            FileType::Image => self.parse_image(path, &filename, &source),
        }
    }

    /// One record per page; pages without a text layer go through OCR
    fn parse_pdf(&self, path: &Path, filename: &str, source: &str) -> Result<Vec<PageRecord>> {
        let data = std::fs::read(path).map_err(|e| Error::document_read(source, e.to_string()))?;
        let doc = lopdf::Document::load_mem(&data)
            .map_err(|e| Error::document_read(source, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        let mut ocr_pages = 0usize;

        for page_number in doc.get_pages().into_keys() {
            let embedded = match doc.extract_text(&[page_number]) {
                Ok(text) => cleanup_pdf_text(&text),
                Err(e) => {
                    tracing::debug!("No text layer on {} page {}: {}", filename, page_number, e);
                    String::new()
                }
            };

            let text = if embedded.trim().is_empty() {
                ocr_pages += 1;
                self.ocr.ocr_pdf_page(path, page_number)?
            } else {
                embedded
            };

            if let Some(record) = PageRecord::new(&text, filename, page_number, source) {
                pages.push(record);
            }
        }

        if ocr_pages > 0 {
            tracing::info!("{}: {} page(s) needed OCR", filename, ocr_pages);
        }

        Ok(pages)
    }

    /// The whole file is one page
    fn parse_text(path: &Path, filename: &str, source: &str) -> Result<Vec<PageRecord>> {
        let data = std::fs::read(path).map_err(|e| Error::document_read(source, e.to_string()))?;
        let text = String::from_utf8_lossy(&data);
        Ok(PageRecord::new(&text, filename, 1, source).into_iter().collect())
    }

    /// Paragraph text concatenated into one page
    fn parse_docx(path: &Path, filename: &str, source: &str) -> Result<Vec<PageRecord>> {
        let data = std::fs::read(path).map_err(|e| Error::document_read(source, e.to_string()))?;
        let doc = docx_rs::read_docx(&data)
            .map_err(|e| Error::document_read(source, format!("Failed to read DOCX: {}", e)))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(PageRecord::new(&content, filename, 1, source).into_iter().collect())
    }

    fn parse_image(&self, path: &Path, filename: &str, source: &str) -> Result<Vec<PageRecord>> {
        let text = self.ocr.ocr_image(path)?;
        Ok(PageRecord::new(&text, filename, 1, source)
            .map(|page| page.with_category(IMAGE_CATEGORY))
            .into_iter()
            .collect())
    }
}
