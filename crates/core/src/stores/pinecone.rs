use crate::error::IndexError;
use crate::models::{ChunkMetadata, RetrievalMatch, VectorEntry};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

const BACKEND: &str = "pinecone";

/// HTTP client for a Pinecone-compatible index data plane. One instance per
/// index host; namespacing happens per call.
pub struct PineconeIndex {
    endpoint: String,
    api_key: String,
    dimension: usize,
    client: Client,
}

impl PineconeIndex {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            dimension,
            client: Client::new(),
        }
    }

    fn endpoint_url(&self, path: &str) -> Result<String, IndexError> {
        let url = Url::parse(&self.endpoint)?.join(path)?;
        Ok(url.into())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::InvalidRequest(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorEntry],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Option<Vec<f32>>,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    delete_all: bool,
    namespace: &'a str,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        namespace: &str,
        entries: &[VectorEntry],
    ) -> Result<usize, IndexError> {
        if entries.is_empty() {
            return Ok(0);
        }
        for entry in entries {
            self.check_dimension(&entry.values)?;
        }

        let response = self
            .client
            .post(self.endpoint_url("/vectors/upsert")?)
            .header("Api-Key", &self.api_key)
            .json(&UpsertRequest {
                vectors: entries,
                namespace,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::BackendResponse {
                backend: BACKEND.to_string(),
                details: status.to_string(),
            });
        }

        let parsed: UpsertResponse = response.json().await?;
        Ok(parsed.upserted_count)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, IndexError> {
        self.check_dimension(vector)?;

        let response = self
            .client
            .post(self.endpoint_url("/query")?)
            .header("Api-Key", &self.api_key)
            .json(&QueryRequest {
                namespace,
                vector,
                top_k,
                include_metadata: true,
                include_values: false,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IndexError::NamespaceNotFound(namespace.to_string()));
        }
        if !status.is_success() {
            return Err(IndexError::BackendResponse {
                backend: BACKEND.to_string(),
                details: status.to_string(),
            });
        }

        let parsed: QueryResponse = response.json().await?;
        let matches = parsed
            .matches
            .into_iter()
            .filter_map(|hit| match hit.metadata {
                Some(metadata) => Some(RetrievalMatch {
                    id: hit.id,
                    score: hit.score,
                    values: hit.values,
                    metadata,
                }),
                None => {
                    // entries written by this crate always carry metadata
                    warn!(id = %hit.id, "dropping match without metadata");
                    None
                }
            })
            .collect();

        Ok(matches)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), IndexError> {
        let response = self
            .client
            .post(self.endpoint_url("/vectors/delete")?)
            .header("Api-Key", &self.api_key)
            .json(&DeleteRequest {
                delete_all: true,
                namespace,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IndexError::NamespaceNotFound(namespace.to_string()));
        }
        if !status.is_success() {
            return Err(IndexError::BackendResponse {
                backend: BACKEND.to_string(),
                details: status.to_string(),
            });
        }

        Ok(())
    }
}
