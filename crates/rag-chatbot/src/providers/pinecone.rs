//! Pinecone serverless index over REST
//!
//! Control plane (`api.pinecone.io`) creates and describes the index; the data plane host it
//! reports serves upserts and queries. Both authenticate with the `Api-Key` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::{EmbeddedChunk, ScoredMatch, VectorMetadata};

use super::retry::{AttemptError, RetryPolicy};
use super::vector_index::VectorIndexProvider;

const API_VERSION: &str = "2024-07";

/// Pinecone index client
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    index_name: String,
    control_url: String,
    dimension: usize,
    metric: String,
    cloud: String,
    region: String,
    host: OnceCell<String>,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a VectorMetadata,
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: usize,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    namespace: &'a str,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(rename = "includeValues")]
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<VectorMetadata>,
}

impl PineconeIndex {
    /// Create a client; the index itself is only touched by [`VectorIndexProvider::ensure_index`]
    pub fn new(config: &IndexConfig, retry: RetryPolicy) -> Result<Self> {
        if config.index_name.trim().is_empty() {
            return Err(Error::Config("PINECONE_INDEX_NAME is not configured".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("PINECONE_API_KEY is not configured".to_string()));
        }

        let host = OnceCell::new();
        if let Some(configured) = config.host.as_deref().filter(|h| !h.trim().is_empty()) {
            // Set on a fresh cell cannot fail.
            let _ = host.set(normalize_host(configured));
        }

        Ok(Self {
            client: super::http_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            control_url: config.control_url.trim_end_matches('/').to_string(),
            dimension: config.dimension,
            metric: config.metric.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            host,
            retry,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Data plane base URL, looked up from the control plane once
    async fn data_url(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| async move {
                let description = self.describe_index().await?;
                Ok::<_, Error>(normalize_host(&description.host))
            })
            .await
            .map(String::as_str)
    }

    async fn describe_index(&self) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{}", self.control_url, self.index_name);
        let url = &url;

        self.retry
            .run("Pinecone describe_index", || async move {
                let response = self
                    .request(reqwest::Method::GET, url)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::Config(format!("Pinecone describe_index failed: {}", e)),
                        )
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::from_status(
                        status,
                        Error::Config(format!(
                            "Pinecone index '{}' unavailable ({}): {}",
                            self.index_name, status, body
                        )),
                    ));
                }

                response.json::<IndexDescription>().await.map_err(|e| {
                    AttemptError::permanent(Error::Config(format!(
                        "Failed to parse Pinecone index description: {}",
                        e
                    )))
                })
            })
            .await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn ensure_index(&self) -> Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = CreateIndexRequest {
            name: &self.index_name,
            dimension: self.dimension,
            metric: &self.metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let (url, body) = (&url, &body);

        let created = self
            .retry
            .run("Pinecone create_index", || async move {
                let response = self
                    .request(reqwest::Method::POST, url)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::Config(format!("Pinecone create_index failed: {}", e)),
                        )
                    })?;

                let status = response.status();
                if status == StatusCode::CONFLICT {
                    return Ok(false);
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::from_status(
                        status,
                        Error::Config(format!(
                            "Failed to create Pinecone index '{}' ({}): {}",
                            self.index_name, status, body
                        )),
                    ));
                }
                Ok(true)
            })
            .await?;

        if created {
            tracing::info!(
                "Created Pinecone index '{}' ({} dims, {}, {}/{})",
                self.index_name,
                self.dimension,
                self.metric,
                self.cloud,
                self.region
            );
        } else {
            tracing::info!("Pinecone index '{}' already exists", self.index_name);
        }

        self.data_url().await?;
        Ok(())
    }

    async fn upsert(&self, vectors: &[EmbeddedChunk], namespace: &str) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.data_url().await?);
        let body = UpsertRequest {
            vectors: vectors
                .iter()
                .map(|v| UpsertVector {
                    id: &v.id,
                    values: &v.vector,
                    metadata: &v.metadata,
                })
                .collect(),
            namespace,
        };

        let (url, body) = (&url, &body);

        let response: UpsertResponse = self
            .retry
            .run("Pinecone upsert", || async move {
                let response = self
                    .request(reqwest::Method::POST, url)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(&e, Error::IndexWrite(e.to_string()))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::from_status(
                        status,
                        Error::IndexWrite(format!("HTTP {}: {}", status, body)),
                    ));
                }

                response.json().await.map_err(|e| {
                    AttemptError::permanent(Error::IndexWrite(format!(
                        "Failed to parse upsert response: {}",
                        e
                    )))
                })
            })
            .await?;

        Ok(response.upserted_count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>> {
        let url = format!(
            "{}/query",
            self.data_url()
                .await
                .map_err(|e| Error::IndexQuery(e.to_string()))?
        );
        let body = QueryRequest {
            vector,
            top_k,
            namespace,
            include_metadata,
            include_values: false,
        };

        let (url, body) = (&url, &body);

        let response: QueryResponse = self
            .retry
            .run("Pinecone query", || async move {
                let response = self
                    .request(reqwest::Method::POST, url)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(&e, Error::IndexQuery(e.to_string()))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::from_status(
                        status,
                        Error::IndexQuery(format!("HTTP {}: {}", status, body)),
                    ));
                }

                response.json().await.map_err(|e| {
                    AttemptError::permanent(Error::IndexQuery(format!(
                        "Failed to parse query response: {}",
                        e
                    )))
                })
            })
            .await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| ScoredMatch {
                vector_id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.describe_index().await.is_ok())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("docs-abc123.svc.aped-4627-b74a.pinecone.io/"),
            "https://docs-abc123.svc.aped-4627-b74a.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_requires_index_name_and_key() {
        let config = IndexConfig {
            api_key: "pk".into(),
            ..IndexConfig::default()
        };
        assert!(matches!(
            PineconeIndex::new(&config, RetryPolicy::none()),
            Err(Error::Config(msg)) if msg.contains("PINECONE_INDEX_NAME")
        ));

        let config = IndexConfig {
            index_name: "docs".into(),
            ..IndexConfig::default()
        };
        assert!(matches!(
            PineconeIndex::new(&config, RetryPolicy::none()),
            Err(Error::Config(msg)) if msg.contains("PINECONE_API_KEY")
        ));
    }

    #[test]
    fn test_create_index_body() {
        let body = CreateIndexRequest {
            name: "docs",
            dimension: 768,
            metric: "cosine",
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: "aws",
                    region: "us-east-1",
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "name": "docs",
                "dimension": 768,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })
        );
    }

    #[test]
    fn test_query_body_and_response() {
        let vector = [0.6f32, 0.8];
        let body = QueryRequest {
            vector: &vector,
            top_k: 5,
            namespace: "handbook",
            include_metadata: true,
            include_values: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["topK"], 5);
        assert_eq!(value["includeMetadata"], true);

        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                { "id": "a", "score": 0.91, "metadata": { "text": "hi", "file_path": "https://x.io/a", "page_number": 2.0 } },
                { "id": "b", "score": 0.42 }
            ],
            "namespace": "handbook"
        }))
        .unwrap();
        assert_eq!(response.matches.len(), 2);
        let first = response.matches[0].metadata.as_ref().unwrap();
        assert_eq!(first.source_path, "https://x.io/a");
        assert_eq!(first.page_number, 2);
        assert!(response.matches[1].metadata.is_none());
    }
}
