use crate::error::IndexError;
use crate::models::{RetrievalMatch, VectorEntry};
use async_trait::async_trait;

/// A namespaced similarity index. Namespaces are logically disjoint, so
/// concurrent writes to different namespaces never contend; isolation is the
/// backend's job.
#[async_trait]
pub trait VectorIndex {
    /// Writes entries under `namespace` and returns how many the backend
    /// confirmed. Entry ids are caller-chosen; writing an existing id
    /// overwrites instead of duplicating.
    async fn upsert(&self, namespace: &str, entries: &[VectorEntry])
        -> Result<usize, IndexError>;

    /// Returns up to `top_k` nearest entries within `namespace`, with
    /// metadata, ordered by descending similarity.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, IndexError>;

    /// Drops every entry in `namespace`.
    async fn delete_namespace(&self, namespace: &str) -> Result<(), IndexError>;
}
