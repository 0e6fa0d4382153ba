use crate::embeddings::Embedder;
use crate::error::RagError;
use crate::generator::AnswerGenerator;
use crate::models::{HealthReport, HealthStatus, QueryRequest, QueryResponse, SectionSummary};
use crate::retriever::Retriever;
use crate::traits::{GenerationBackend, VectorIndex};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// Request-level entry point: retrieve, then generate. No retries here; a
/// collaborator failure propagates to the transport boundary as-is.
pub struct QueryPipeline<E, V, G>
where
    E: Embedder,
    V: VectorIndex,
    G: GenerationBackend,
{
    retriever: Retriever<E, V>,
    generator: AnswerGenerator<G>,
    version: String,
}

impl<E, V, G> QueryPipeline<E, V, G>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
    G: GenerationBackend + Send + Sync,
{
    pub fn new(
        retriever: Retriever<E, V>,
        generator: AnswerGenerator<G>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            generator,
            version: version.into(),
        }
    }

    pub async fn process_query(&self, request: &QueryRequest) -> Result<QueryResponse, RagError> {
        let contexts = self
            .retriever
            .search(
                &request.question,
                DEFAULT_TOP_K,
                DEFAULT_SCORE_THRESHOLD,
                request.language,
            )
            .await?;

        let response = self.generator.generate(request, &contexts).await;

        tracing::info!(
            language = %request.language,
            contexts = contexts.len(),
            has_answer = response.has_answer,
            response_time_ms = response.response_time_ms,
            "query processed"
        );

        Ok(response)
    }

    pub async fn list_sections(
        &self,
        chapter_filter: Option<&str>,
    ) -> Result<Vec<SectionSummary>, RagError> {
        self.retriever.get_all_sections(chapter_filter).await
    }

    pub async fn health(&self) -> HealthReport {
        let vector_index_connected = self.retriever.index().is_connected().await;
        let generator_available = self.generator.is_available();

        HealthReport {
            status: if vector_index_connected && generator_available {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            vector_index_connected,
            generator_available,
            version: self.version.clone(),
        }
    }
}
