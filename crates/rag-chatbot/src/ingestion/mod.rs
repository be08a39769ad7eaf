//! Document ingestion: extraction, OCR fallback, chunking and the end-to-end pipeline

pub mod chunker;
pub mod extractor;
pub mod ocr;
pub mod parser;
pub mod pipeline;

pub use chunker::TextChunker;
pub use extractor::{Extraction, TextExtractor};
pub use ocr::OcrEngine;
pub use parser::DocumentParser;
pub use pipeline::{IngestPipeline, UploadedFile};
