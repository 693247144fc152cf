use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text of one source page. `page` is 0-based and matches the document's own
/// pagination; pages with no extractable text keep their slot so attribution
/// downstream stays aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// A bounded text window drawn from a single page. `chunk_index` increases
/// across the whole document, not per page.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_index: u64,
    pub page: u32,
    pub text: String,
}

/// Metadata persisted alongside every vector. `source` is the owning
/// namespace, so cross-namespace leaks are detectable at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
    pub text: String,
    pub chunk: u64,
}

/// The persisted unit in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A per-query similarity hit. Transient; discarded once context is built.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub values: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

/// Window sizes are counted in Unicode scalar values, not bytes or tokens.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub window_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            window_size: 1_000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    pub top_k: usize,
    /// Matches must score strictly above this to enter the context.
    pub min_score: f32,
    pub retry: crate::retry::RetryPolicy,
    pub timeout: Option<std::time::Duration>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_score: 0.5,
            retry: crate::retry::RetryPolicy::default(),
            timeout: None,
        }
    }
}

/// What one ingestion run wrote. `written` equals `chunk_count` on success;
/// partial failures are reported through errors instead.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub namespace: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub written: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Namespace key for an uploaded document: original file name plus upload
/// timestamp in milliseconds. Stable for the lifetime of the document record
/// and used verbatim at ingestion and every query.
pub fn derive_namespace(file_name: &str, uploaded_at: DateTime<Utc>) -> String {
    format!("{}-{}", file_name, uploaded_at.timestamp_millis())
}

/// Human-readable title recovered from a namespace key: strips the trailing
/// timestamp, then the file extension.
pub fn display_name(namespace: &str) -> String {
    let mut name = namespace;
    if let Some((head, tail)) = name.rsplit_once('-') {
        if !tail.is_empty() && tail.bytes().all(|byte| byte.is_ascii_digit()) {
            name = head;
        }
    }
    let name = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    if name.is_empty() {
        "Document".to_string()
    } else {
        name.to_string()
    }
}
