//! Embedded chunks and index match types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::document::Chunk;

/// Metadata stored alongside every vector in the index
///
/// Field names on the wire match what earlier deployments wrote, so existing indexes stay
/// readable: the source path is stored as `file_path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    #[serde(default)]
    pub filename: String,
    #[serde(default, deserialize_with = "deserialize_page_number")]
    pub page_number: u32,
    #[serde(rename = "file_path", default)]
    pub source_path: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl From<&Chunk> for VectorMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            filename: chunk.metadata.filename.clone(),
            page_number: chunk.metadata.page_number,
            source_path: chunk.metadata.source_path.clone(),
            text: chunk.text.clone(),
            category: chunk.metadata.category.clone(),
            title: None,
            section: None,
        }
    }
}

// Index metadata comes back as JSON numbers that may be floats ("3.0").
fn deserialize_page_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let page = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(page).unwrap_or(u32::MAX))
}

/// A chunk with its unit-length vector and identifier
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
    pub raw_text: String,
}

/// One nearest-neighbour hit from the index
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub vector_id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}
