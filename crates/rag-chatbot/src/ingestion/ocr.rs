//! OCR fallback through poppler (`pdftoppm`) and `tesseract`
//!
//! Both tools run as subprocesses. A missing tool is a configuration problem, not a
//! property of the document, so it is reported as [`Error::Config`].

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Renders scanned pages and images to text
pub struct OcrEngine {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    dpi: u32,
    language: String,
    pdftoppm_available: OnceLock<bool>,
    tesseract_available: OnceLock<bool>,
}

impl OcrEngine {
    pub fn new(config: &OcrConfig) -> Self {
        let pdftoppm = match &config.poppler_path {
            Some(dir) => dir.join("pdftoppm"),
            None => PathBuf::from("pdftoppm"),
        };

        Self {
            pdftoppm,
            tesseract: PathBuf::from(&config.tesseract_cmd),
            dpi: config.dpi,
            language: config.language.clone(),
            pdftoppm_available: OnceLock::new(),
            tesseract_available: OnceLock::new(),
        }
    }

    /// Check if pdftoppm can be spawned
    pub fn has_pdftoppm(&self) -> bool {
        *self.pdftoppm_available.get_or_init(|| {
            Command::new(&self.pdftoppm)
                .arg("-v")
                .output()
                .map(|_| true) // pdftoppm -v exits non-zero on some builds; spawning is enough
                .unwrap_or(false)
        })
    }

    /// Check if tesseract can be spawned
    pub fn has_tesseract(&self) -> bool {
        *self.tesseract_available.get_or_init(|| {
            Command::new(&self.tesseract)
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    fn require_tools(&self, need_renderer: bool) -> Result<()> {
        if need_renderer && !self.has_pdftoppm() {
            return Err(Error::Config(format!(
                "Poppler is required for OCR but '{}' could not be run. Install poppler-utils or set POPPLER_PATH to its bin directory.",
                self.pdftoppm.display()
            )));
        }
        if !self.has_tesseract() {
            return Err(Error::Config(format!(
                "Tesseract is required for OCR but '{}' could not be run. Install tesseract-ocr or set TESSERACT_PATH.",
                self.tesseract.display()
            )));
        }
        Ok(())
    }

    /// OCR a single 1-indexed page of a PDF on disk
    pub fn ocr_pdf_page(&self, pdf_path: &Path, page_number: u32) -> Result<String> {
        self.require_tools(true)?;

        let work_dir = tempfile::Builder::new().prefix("rag-ocr-").tempdir()?;
        let prefix = work_dir.path().join("page");
        let page = page_number.to_string();

        let output = Command::new(&self.pdftoppm)
            .args(["-png", "-singlefile", "-r"])
            .arg(self.dpi.to_string())
            .args(["-f", page.as_str(), "-l", page.as_str()])
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| Error::Config(format!("pdftoppm failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::document_read(
                pdf_path.display().to_string(),
                format!("pdftoppm could not render page {}: {}", page_number, stderr.trim()),
            ));
        }

        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            return Err(Error::document_read(
                pdf_path.display().to_string(),
                format!("pdftoppm produced no image for page {}", page_number),
            ));
        }

        let text = self.run_tesseract(&image_path)?;
        tracing::debug!(
            "OCR extracted {} characters from {} page {}",
            text.len(),
            pdf_path.display(),
            page_number
        );
        Ok(text)
    }

    /// OCR a raster image on disk
    pub fn ocr_image(&self, image_path: &Path) -> Result<String> {
        self.require_tools(false)?;
        let text = self.run_tesseract(image_path)?;
        tracing::debug!("Image OCR extracted {} characters from {}", text.len(), image_path.display());
        Ok(text)
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String> {
        let output = Command::new(&self.tesseract)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", self.language.as_str()])
            .output()
            .map_err(|e| Error::Config(format!("tesseract failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::document_read(
                image_path.display().to_string(),
                format!("tesseract error: {}", stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
