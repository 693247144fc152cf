use crate::chunking::chunk_pages;
use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, IndexError, IngestError};
use crate::extractor::extract_pages;
use crate::models::{Chunk, ChunkMetadata, ChunkingOptions, IngestionReport, VectorEntry};
use crate::retry::{run_with_retries, RetryPolicy};
use crate::traits::VectorIndex;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub chunking: ChunkingOptions,
    /// Simultaneous in-flight embedding calls. Bounded to respect provider
    /// rate limits; order of results is unaffected.
    pub embed_concurrency: usize,
    pub upsert_batch_size: usize,
    /// Applied to each embedding call and each upsert batch; retried writes
    /// are safe because entry ids are deterministic.
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingOptions::default(),
            embed_concurrency: 8,
            upsert_batch_size: 100,
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }
}

/// Orchestrates load → chunk → embed → write for one document into one
/// namespace. Holds no state between runs; re-running with the same bytes
/// and namespace overwrites the same entry ids.
pub struct IngestionPipeline<E, V> {
    embedder: E,
    index: V,
    options: IngestionOptions,
}

impl<E, V> IngestionPipeline<E, V>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(embedder: E, index: V) -> Self {
        Self {
            embedder,
            index,
            options: IngestionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn ingest(
        &self,
        bytes: &[u8],
        namespace: &str,
    ) -> Result<IngestionReport, IngestError> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(bytes, namespace))
                .await
                .map_err(|_| IngestError::Timeout(limit))?,
            None => self.run(bytes, namespace).await,
        }
    }

    async fn run(&self, bytes: &[u8], namespace: &str) -> Result<IngestionReport, IngestError> {
        // parsing and chunking happen before any network cost
        let pages = extract_pages(bytes)?;
        let chunks = chunk_pages(&pages, self.options.chunking)?;
        let page_count = pages.len();

        debug!(namespace, pages = page_count, chunks = chunks.len(), "document chunked");

        let entries: Vec<VectorEntry> = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| self.build_entry(namespace, chunk)),
        )
        .buffered(self.options.embed_concurrency.max(1))
        .try_collect()
        .await?;

        let total = entries.len();
        let mut written = 0usize;
        for batch in entries.chunks(self.options.upsert_batch_size.max(1)) {
            let outcome = run_with_retries(self.options.retry, IndexError::is_retryable, || {
                self.index.upsert(namespace, batch)
            })
            .await;
            match outcome {
                Ok(count) => written += count,
                Err(source) => {
                    return Err(IngestError::IndexWrite {
                        written,
                        total,
                        source,
                    })
                }
            }
        }

        info!(namespace, chunks = total, written, "document ingested");

        Ok(IngestionReport {
            namespace: namespace.to_string(),
            page_count,
            chunk_count: total,
            written,
            ingested_at: Utc::now(),
        })
    }

    async fn build_entry(
        &self,
        namespace: &str,
        chunk: Chunk,
    ) -> Result<VectorEntry, IngestError> {
        let values = run_with_retries(self.options.retry, EmbeddingError::is_retryable, || {
            self.embedder.embed(&chunk.text)
        })
        .await
        .map_err(|source| IngestError::Embedding {
            chunk_index: chunk.chunk_index,
            source,
        })?;

        Ok(VectorEntry {
            id: entry_id(namespace, &chunk),
            values,
            metadata: ChunkMetadata {
                source: namespace.to_string(),
                page: chunk.page,
                text: chunk.text,
                chunk: chunk.chunk_index,
            },
        })
    }
}

/// Entry id: sha-256 over namespace, chunk position, and chunk text. Unique
/// across the whole index, and stable across runs so re-ingestion overwrites
/// instead of duplicating.
pub fn entry_id(namespace: &str, chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(chunk.chunk_index.to_le_bytes());
    hasher.update(chunk.text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::error::{EmbeddingError, IndexError};
    use crate::extractor::pdf_with_pages;
    use crate::models::RetrievalMatch;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder { dimensions: 16 },
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        entries: Mutex<HashMap<String, BTreeMap<String, VectorEntry>>>,
        upsert_calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl RecordingIndex {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::default()
            }
        }

        fn namespace_ids(&self, namespace: &str) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .get(namespace)
                .map(|entries| entries.keys().cloned().collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(
            &self,
            namespace: &str,
            entries: &[VectorEntry],
        ) -> Result<usize, IndexError> {
            let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(IndexError::BackendResponse {
                    backend: "fake".to_string(),
                    details: "503 Service Unavailable".to_string(),
                });
            }

            let mut guard = self.entries.lock().unwrap();
            let namespace_entries = guard.entry(namespace.to_string()).or_default();
            for entry in entries {
                namespace_entries.insert(entry.id.clone(), entry.clone());
            }
            Ok(entries.len())
        }

        async fn query(
            &self,
            _namespace: &str,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<RetrievalMatch>, IndexError> {
            Ok(Vec::new())
        }

        async fn delete_namespace(&self, namespace: &str) -> Result<(), IndexError> {
            self.entries.lock().unwrap().remove(namespace);
            Ok(())
        }
    }

    fn small_windows() -> IngestionOptions {
        IngestionOptions {
            chunking: ChunkingOptions {
                window_size: 40,
                overlap: 10,
            },
            embed_concurrency: 4,
            upsert_batch_size: 2,
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn corrupt_pdf_aborts_before_any_embedding_call() {
        let embedder = CountingEmbedder::new();
        let index = RecordingIndex::default();
        let pipeline = IngestionPipeline::new(embedder, index);

        let result = pipeline.ingest(b"%PDF-1.4\n%broken", "doc.pdf-1").await;

        assert!(matches!(result, Err(IngestError::Parse(_))));
        assert_eq!(pipeline.embedder.call_count(), 0);
        assert_eq!(pipeline.index.upsert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ingest_writes_one_entry_per_chunk_in_order() {
        let bytes = pdf_with_pages(&[
            "the quick brown fox jumps over the lazy dog again and again",
            "",
            "a shorter closing page",
        ]);
        let pipeline =
            IngestionPipeline::new(CountingEmbedder::new(), RecordingIndex::default())
                .with_options(small_windows());

        let report = pipeline.ingest(&bytes, "doc.pdf-1").await.unwrap();

        assert_eq!(report.page_count, 3);
        assert!(report.chunk_count > 1);
        assert_eq!(report.written, report.chunk_count);
        assert_eq!(pipeline.embedder.call_count(), report.chunk_count);

        let guard = pipeline.index.entries.lock().unwrap();
        let stored = guard.get("doc.pdf-1").unwrap();
        assert_eq!(stored.len(), report.chunk_count);

        // chunk metadata keeps the global ordering regardless of how the
        // embedding futures interleaved
        let mut indices: Vec<u64> = stored.values().map(|entry| entry.metadata.chunk).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..report.chunk_count as u64).collect::<Vec<_>>());
        assert!(stored.values().all(|entry| entry.metadata.source == "doc.pdf-1"));
        assert!(stored.values().all(|entry| entry.values.len() == 16));
    }

    #[tokio::test]
    async fn reingesting_the_same_document_is_idempotent() {
        let bytes = pdf_with_pages(&["some stable document body that chunks the same way twice"]);
        let pipeline =
            IngestionPipeline::new(CountingEmbedder::new(), RecordingIndex::default())
                .with_options(small_windows());

        let first = pipeline.ingest(&bytes, "doc.pdf-1").await.unwrap();
        let ids_after_first = pipeline.index.namespace_ids("doc.pdf-1");

        let second = pipeline.ingest(&bytes, "doc.pdf-1").await.unwrap();
        let ids_after_second = pipeline.index.namespace_ids("doc.pdf-1");

        assert_eq!(first.chunk_count, second.chunk_count);
        assert_eq!(ids_after_first, ids_after_second);
        assert_eq!(ids_after_second.len(), second.chunk_count);
    }

    #[tokio::test]
    async fn failed_batch_reports_how_much_landed() {
        let bytes = pdf_with_pages(&[
            "enough text to produce several chunks with the small window settings used here",
        ]);
        let pipeline =
            IngestionPipeline::new(CountingEmbedder::new(), RecordingIndex::failing_on(1))
                .with_options(IngestionOptions {
                    upsert_batch_size: 1,
                    ..small_windows()
                });

        let result = pipeline.ingest(&bytes, "doc.pdf-1").await;

        match result {
            Err(IngestError::IndexWrite { written, total, .. }) => {
                assert_eq!(written, 1);
                assert!(total > 1);
            }
            other => panic!("expected IndexWrite error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ingests_bytes_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.pdf");
        std::fs::write(&path, pdf_with_pages(&["uploaded document body"])).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let pipeline =
            IngestionPipeline::new(CountingEmbedder::new(), RecordingIndex::default());
        let report = pipeline.ingest(&bytes, "upload.pdf-1700000000000").await.unwrap();

        assert_eq!(report.namespace, "upload.pdf-1700000000000");
        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.written, 1);
    }

    #[test]
    fn entry_ids_differ_across_namespaces_and_positions() {
        let chunk = Chunk {
            chunk_index: 0,
            page: 0,
            text: "same text".to_string(),
        };
        let shifted = Chunk {
            chunk_index: 1,
            ..chunk.clone()
        };

        assert_eq!(entry_id("ns-a", &chunk), entry_id("ns-a", &chunk));
        assert_ne!(entry_id("ns-a", &chunk), entry_id("ns-b", &chunk));
        assert_ne!(entry_id("ns-a", &chunk), entry_id("ns-a", &shifted));
    }
}
