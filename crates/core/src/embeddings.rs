use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

const DEFAULT_MODEL: &str = "text-embedding-004";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Converts text into a fixed-dimension vector. Empty or whitespace-only
/// input is rejected with [`EmbeddingError::EmptyInput`] by every
/// implementation; callers can rely on that instead of pre-checking.
#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Gemini `embedContent` adapter. Stateless apart from the HTTP client; no
/// retries here, retry policy belongs to the orchestrators.
pub struct GeminiEmbedder {
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: RequestContent,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl EmbedContentRequest {
    fn new(model: &str, text: &str) -> Self {
        Self {
            model: format!("models/{model}"),
            content: RequestContent {
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            },
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(format!(
                "{}/models/{}:embedContent",
                self.endpoint, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&EmbedContentRequest::new(&self.model, text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                details,
            });
        }

        let payload: EmbedContentResponse = response.json().await?;
        let values = payload.embedding.values;

        if values.is_empty() {
            return Err(EmbeddingError::Response("embedding has no values".to_string()));
        }
        if values.len() != self.dimensions {
            return Err(EmbeddingError::Dimensions {
                expected: self.dimensions,
                got: values.len(),
            });
        }

        debug!(model = %self.model, dimensions = values.len(), "embedded text");
        Ok(values)
    }
}

/// Deterministic local embedder hashing character trigrams into a normalized
/// bucket vector. Needs no network, so it doubles as an offline backend and
/// the embedder used in tests.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    pub dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 128 }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            // FNV-1a over the trigram bytes
            let mut hash = 1469598103934665603u64;
            for ch in window {
                let mut buffer = [0u8; 4];
                for byte in ch.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let first = embedder.embed("What is the termination clause?").await.unwrap();
        let second = embedder.embed("What is the termination clause?").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hashing_embedder_outputs_requested_length() {
        let embedder = HashingEmbedder { dimensions: 32 };
        let vector = embedder.embed("abcdef").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn whitespace_only_input_is_rejected() {
        let embedder = HashingEmbedder::default();
        let result = embedder.embed("   \n\t").await;
        assert!(matches!(result, Err(EmbeddingError::EmptyInput)));
    }

    #[test]
    fn embed_request_matches_provider_wire_shape() {
        let request = EmbedContentRequest::new("text-embedding-004", "hello");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "models/text-embedding-004");
        assert_eq!(value["content"]["parts"][0]["text"], "hello");
    }

    #[test]
    fn embed_response_parses_values() {
        let payload: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#).unwrap();
        assert_eq!(payload.embedding.values, vec![0.1, 0.2, 0.3]);
    }
}
