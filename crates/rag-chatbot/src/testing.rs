//! In-process fakes for the provider traits

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::OcrConfig;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorIndexProvider};
use crate::types::{EmbeddedChunk, ScoredMatch, VectorMetadata};

/// Bag-of-words hashing embedder: texts sharing words land close together
pub struct KeywordEmbedder {
    pub dimensions: usize,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % self.dimensions] += 1.0;
        }
        // Keep every vector non-zero.
        vector[0] += 0.01;
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Index that records calls and answers queries with fixed matches
#[derive(Default)]
pub struct RecordingIndex {
    pub matches: Vec<ScoredMatch>,
    pub upsert_batches: Mutex<Vec<usize>>,
    pub query_calls: AtomicUsize,
    /// 1-based upsert call that fails
    pub fail_on_upsert: Option<usize>,
    pub fail_queries: bool,
}

impl RecordingIndex {
    pub fn with_matches(matches: Vec<ScoredMatch>) -> Self {
        Self {
            matches,
            ..Default::default()
        }
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_batches.lock().len()
    }
}

#[async_trait]
impl VectorIndexProvider for RecordingIndex {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, vectors: &[EmbeddedChunk], _namespace: &str) -> Result<usize> {
        let call = {
            let mut batches = self.upsert_batches.lock();
            batches.push(vectors.len());
            batches.len()
        };
        if self.fail_on_upsert == Some(call) {
            return Err(Error::internal("HTTP 503 from index"));
        }
        Ok(vectors.len())
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        _namespace: &str,
        _include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(Error::internal("connection reset"));
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// What a [`ScriptedLlm`] does when called
pub enum Script {
    Reply(String),
    AuthFailure,
    Failure,
}

/// LLM that follows a script and keeps every prompt it was given
pub struct ScriptedLlm {
    script: Script,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(answer: &str) -> Self {
        Self::new(Script::Reply(answer.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match &self.script {
            Script::Reply(answer) => Ok(answer.clone()),
            Script::AuthFailure => Err(Error::generation_auth("HTTP 401: invalid api key")),
            Script::Failure => Err(Error::generation("HTTP 500: upstream error")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// A match carrying `text` from `source_path`
pub fn scored(id: &str, score: f32, text: &str, source_path: &str) -> ScoredMatch {
    ScoredMatch {
        vector_id: id.to_string(),
        score,
        metadata: VectorMetadata {
            filename: source_path.rsplit('/').next().unwrap_or_default().to_string(),
            page_number: 1,
            source_path: source_path.to_string(),
            text: text.to_string(),
            ..Default::default()
        },
    }
}

/// Write a PDF with one page per entry; an empty entry becomes a page with no text layer
pub fn write_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 800.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// OCR settings pointing at tools that do not exist
pub fn missing_ocr_tools() -> OcrConfig {
    OcrConfig {
        poppler_path: Some(PathBuf::from("/nonexistent/poppler/bin")),
        tesseract_cmd: "/nonexistent/tesseract".to_string(),
        ..OcrConfig::default()
    }
}

/// Shell stand-ins for `pdftoppm` and `tesseract` in `dir`
///
/// The renderer writes an empty `<prefix>.png`; the recognizer prints `recognized` for any
/// image. `recognized` must not contain single quotes.
#[cfg(unix)]
pub fn stub_ocr_tools(dir: &Path, recognized: &str) -> OcrConfig {
    use std::os::unix::fs::PermissionsExt;

    let pdftoppm = "#!/bin/sh\n[ \"$1\" = \"-v\" ] && exit 0\nfor last; do :; done\n: > \"$last.png\"\n";
    let tesseract = format!(
        "#!/bin/sh\n[ \"$1\" = \"--version\" ] && {{ echo tesseract 5.3.0; exit 0; }}\nprintf '%s\\n' '{}'\n",
        recognized
    );

    for (name, script) in [("pdftoppm", pdftoppm.to_string()), ("tesseract", tesseract)] {
        let path = dir.join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    OcrConfig {
        poppler_path: Some(dir.to_path_buf()),
        tesseract_cmd: dir.join("tesseract").display().to_string(),
        ..OcrConfig::default()
    }
}
