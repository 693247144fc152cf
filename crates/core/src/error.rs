use std::time::Duration;
use thiserror::Error;

/// Failures while turning raw PDF bytes into page text. None of these are
/// retryable with the same input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is not a pdf document: {0}")]
    NotPdf(String),

    #[error("pdf is encrypted")]
    Encrypted,

    #[error("pdf parse error: {0}")]
    Malformed(String),
}

/// Failures from the embedding provider. The adapter never retries on its
/// own; callers decide based on [`EmbeddingError::is_retryable`].
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {details}")]
    Provider { status: u16, details: String },

    #[error("invalid embedding response: {0}")]
    Response(String),

    #[error("embedding has {got} dimensions, expected {expected}")]
    Dimensions { expected: usize, got: usize },
}

impl EmbeddingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Http(_) => true,
            EmbeddingError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failures from the vector index backend.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
}

impl IndexError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndexError::Http(_) | IndexError::BackendResponse { .. }
        )
    }
}

/// Failures while ingesting one document. Parse and config failures happen
/// before any network call; the rest carry enough detail for an idempotent
/// re-run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding chunk {chunk_index} failed: {source}")]
    Embedding {
        chunk_index: u64,
        source: EmbeddingError,
    },

    #[error("vector write stopped after {written} of {total} entries: {source}")]
    IndexWrite {
        written: usize,
        total: usize,
        source: IndexError,
    },

    #[error("ingestion timed out after {0:?}")]
    Timeout(Duration),
}

impl IngestError {
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Parse(_) | IngestError::InvalidChunkConfig(_) => false,
            IngestError::Embedding { source, .. } => source.is_retryable(),
            IngestError::IndexWrite { source, .. } => source.is_retryable(),
            IngestError::Timeout(_) => true,
        }
    }
}

/// Failures while building context for a chat turn. An empty context is not
/// an error; a missing namespace is, and stays distinguishable from
/// transient index faults.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("vector index error: {0}")]
    Index(IndexError),

    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),
}

impl From<IndexError> for RetrievalError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::NamespaceNotFound(namespace) => RetrievalError::NamespaceNotFound(namespace),
            other => RetrievalError::Index(other),
        }
    }
}

impl RetrievalError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::EmptyQuery | RetrievalError::NamespaceNotFound(_) => false,
            RetrievalError::Embedding(source) => source.is_retryable(),
            RetrievalError::Index(source) => source.is_retryable(),
            RetrievalError::Timeout(_) => true,
        }
    }
}

/// Failures from the answer-generation model.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat model returned {status}: {details}")]
    Provider { status: u16, details: String },

    #[error("chat model returned no content")]
    EmptyResponse,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
