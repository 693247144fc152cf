pub mod chat;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod retrieval;
pub mod retry;
pub mod stores;
pub mod traits;

pub use chat::{build_system_prompt, ChatModel, GeminiChat};
pub use chunking::chunk_pages;
pub use embeddings::{Embedder, GeminiEmbedder, HashingEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{
    ChatError, EmbeddingError, IndexError, IngestError, ParseError, RetrievalError,
};
pub use extractor::extract_pages;
pub use ingest::{entry_id, IngestionOptions, IngestionPipeline};
pub use models::{
    derive_namespace, display_name, Chunk, ChunkMetadata, ChunkingOptions, IngestionReport,
    PageText, RetrievalMatch, RetrievalOptions, VectorEntry,
};
pub use retrieval::ContextBuilder;
pub use retry::RetryPolicy;
pub use stores::PineconeIndex;
pub use traits::VectorIndex;
