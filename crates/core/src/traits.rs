use crate::error::RagError;
use crate::models::{IndexedPoint, ScoredPoint};
use async_trait::async_trait;
use serde_json::Value;

/// One page of a collection scan: the points plus the cursor for the next
/// page, `None` when the scan is exhausted.
pub type ScrollPage = (Vec<ScoredPoint>, Option<Value>);

/// Nearest-neighbor index with payload storage. The retriever only reads;
/// writes happen exclusively through the offline indexing workflow.
#[async_trait]
pub trait VectorIndex {
    /// Creates the collection if absent; never alters an existing one.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), RagError>;

    /// Writes points with upsert-by-id semantics.
    async fn upsert(&self, points: &[IndexedPoint]) -> Result<(), RagError>;

    /// Returns up to `top_k` hits with score >= `score_threshold`, ordered by
    /// descending similarity.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, RagError>;

    /// Fetches one page of a full-collection traversal. `section_filter`
    /// restricts to points whose section id contains the given text. The
    /// cursor is opaque; pass back the value returned by the previous page.
    async fn scroll(
        &self,
        section_filter: Option<&str>,
        page_size: usize,
        cursor: Option<Value>,
    ) -> Result<ScrollPage, RagError>;

    /// Best-effort liveness probe. Must not error; any failure is `false`.
    async fn is_connected(&self) -> bool;

    async fn delete_collection(&self) -> Result<(), RagError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of the scripted exchange sent to the generation backend.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Opaque prompt-to-text generation backend.
#[async_trait]
pub trait GenerationBackend {
    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, RagError>;

    /// True iff credentials are configured. A misconfigured backend still
    /// accepts `generate` calls and fails there; this only feeds health
    /// reporting.
    fn is_configured(&self) -> bool;
}
