use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, IndexError, RetrievalError};
use crate::models::RetrievalOptions;
use crate::retry::run_with_retries;
use crate::traits::VectorIndex;
use tracing::debug;

/// Builds the context for one chat turn: embed the query, search the
/// document's namespace, keep matches above the relevance threshold.
pub struct ContextBuilder<E, V> {
    embedder: E,
    index: V,
    options: RetrievalOptions,
}

impl<E, V> ContextBuilder<E, V>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(embedder: E, index: V) -> Self {
        Self {
            embedder,
            index,
            options: RetrievalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RetrievalOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the text snippets relevant to `query` within `namespace`,
    /// ordered as the index returned them. An empty result means "no
    /// relevant context" and is not an error; index faults and missing
    /// namespaces always surface as errors.
    pub async fn get_context(
        &self,
        query: &str,
        namespace: &str,
    ) -> Result<Vec<String>, RetrievalError> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(query, namespace))
                .await
                .map_err(|_| RetrievalError::Timeout(limit))?,
            None => self.run(query, namespace).await,
        }
    }

    async fn run(&self, query: &str, namespace: &str) -> Result<Vec<String>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let query_vector = run_with_retries(self.options.retry, EmbeddingError::is_retryable, || {
            self.embedder.embed(query)
        })
        .await?;
        let matches = run_with_retries(self.options.retry, IndexError::is_retryable, || {
            self.index.query(namespace, &query_vector, self.options.top_k)
        })
        .await?;

        // strictly above the threshold; a score exactly at it is excluded
        let snippets: Vec<String> = matches
            .into_iter()
            .filter(|hit| hit.score > self.options.min_score)
            .map(|hit| hit.metadata.text)
            .collect();

        debug!(namespace, snippets = snippets.len(), "context assembled");
        Ok(snippets)
    }

    /// Removes every entry for a deleted document.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<(), RetrievalError> {
        self.index.delete_namespace(namespace).await?;
        Ok(())
    }
}
