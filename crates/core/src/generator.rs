use crate::languages::language_pack;
use crate::models::{Citation, QueryRequest, QueryResponse, RetrievedContext};
use crate::traits::{ChatTurn, GenerationBackend};
use std::time::Instant;

/// Turns retrieved contexts into a grounded answer with citations.
///
/// One call walks a fixed path: no contexts short-circuits to the canned
/// no-information answer without touching the backend; otherwise the prompt
/// is built, the backend invoked, and either a cited answer or the apologetic
/// failure response is assembled.
pub struct AnswerGenerator<G>
where
    G: GenerationBackend,
{
    backend: G,
}

impl<G> AnswerGenerator<G>
where
    G: GenerationBackend + Send + Sync,
{
    pub fn new(backend: G) -> Self {
        Self { backend }
    }

    /// True iff the generation backend has credentials configured. Feeds the
    /// health report; it does not gate `generate`.
    pub fn is_available(&self) -> bool {
        self.backend.is_configured()
    }

    pub async fn generate(
        &self,
        request: &QueryRequest,
        contexts: &[RetrievedContext],
    ) -> QueryResponse {
        let started = Instant::now();
        let pack = language_pack(request.language);

        if contexts.is_empty() {
            return QueryResponse {
                answer: pack.no_answer.to_string(),
                citations: Vec::new(),
                has_answer: false,
                confidence: 0.0,
                response_time_ms: started.elapsed().as_millis() as u64,
            };
        }

        let citations: Vec<Citation> = contexts.iter().map(Citation::from_context).collect();
        let user_prompt = build_user_prompt(request, contexts);

        let turns = [
            ChatTurn::user(pack.system_prompt),
            ChatTurn::model(pack.acknowledgment),
            ChatTurn::user(user_prompt),
        ];

        let (answer, has_answer, confidence, citations) =
            match self.backend.generate(&turns).await {
                Ok(answer) => {
                    let confidence = contexts
                        .iter()
                        .map(|context| context.score)
                        .fold(0.0f32, f32::max);
                    (answer, true, confidence, citations)
                }
                Err(error) => {
                    tracing::warn!(%error, "generation backend failed");
                    let answer = format!(
                        "I encountered an error while generating the answer. \
                         Please try again. Error: {error}"
                    );
                    // Citations are only meaningful next to a grounded answer.
                    (answer, false, 0.0, Vec::new())
                }
            };

        QueryResponse {
            answer,
            citations,
            has_answer,
            confidence,
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Assembles the grounding block, the user-selected context and the question
/// into the final user turn, in retrieval-rank order.
fn build_user_prompt(request: &QueryRequest, contexts: &[RetrievedContext]) -> String {
    let grounding = contexts
        .iter()
        .map(|context| {
            format!(
                "[From: {} > {}]\n{}",
                context.metadata.chapter_title,
                context.metadata.section_title,
                context.metadata.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!("Context from textbook:\n{grounding}\n\n");

    if let Some(selected) = &request.selected_context {
        prompt.push_str(&format!("User selected text for context:\n{selected}\n\n"));
    }

    prompt.push_str(&format!(
        "Question: {}\n\nAnswer based only on the context provided above. \
         Be concise and cite the source section.",
        request.question
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::languages::{language_pack, Language};
    use crate::models::EmbeddingMetadata;
    use crate::traits::ChatRole;
    use std::sync::Mutex;

    struct FakeBackend {
        reply: Result<String, String>,
        configured: bool,
        calls: Mutex<Vec<Vec<ChatTurn>>>,
    }

    impl FakeBackend {
        fn answering(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                configured: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                configured: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate(&self, turns: &[ChatTurn]) -> Result<String, RagError> {
            self.calls.lock().unwrap().push(turns.to_vec());
            self.reply
                .clone()
                .map_err(|message| RagError::Generation(message))
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    fn context(section_id: &str, score: f32) -> RetrievedContext {
        RetrievedContext {
            metadata: EmbeddingMetadata {
                section_id: section_id.to_string(),
                chunk_index: 0,
                text: format!("grounding text for {section_id}"),
                token_count: 4,
                chapter_title: "Physical AI".to_string(),
                section_title: "Overview".to_string(),
                url: Some("/docs/chapter-01".to_string()),
                language: Language::En,
            },
            score,
        }
    }

    fn request(question: &str, language: Language) -> QueryRequest {
        QueryRequest {
            question: question.to_string(),
            selected_context: None,
            language,
        }
    }

    #[tokio::test]
    async fn empty_contexts_fall_back_without_calling_backend() {
        let backend = FakeBackend::answering("should never be used");
        let generator = AnswerGenerator::new(backend);

        let response = generator
            .generate(&request("What is quantum gravity?", Language::En), &[])
            .await;

        assert!(!response.has_answer);
        assert_eq!(response.confidence, 0.0);
        assert!(response.citations.is_empty());
        assert_eq!(response.answer, language_pack(Language::En).no_answer);
        assert_eq!(generator.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn fallback_uses_urdu_text_for_urdu_requests() {
        let generator = AnswerGenerator::new(FakeBackend::answering("unused"));

        let response = generator
            .generate(&request("فزیکل اے آئی کیا ہے؟", Language::Ur), &[])
            .await;

        assert_eq!(response.answer, language_pack(Language::Ur).no_answer);
        assert_ne!(response.answer, language_pack(Language::En).no_answer);
    }

    #[tokio::test]
    async fn citations_mirror_contexts_in_order_and_score() {
        let generator = AnswerGenerator::new(FakeBackend::answering("Grounded answer."));
        let contexts = vec![
            context("chapter-01#a", 0.82),
            context("chapter-01#b", 0.71),
            context("chapter-02#c", 0.55),
        ];

        let response = generator
            .generate(&request("What is Physical AI?", Language::En), &contexts)
            .await;

        assert!(response.has_answer);
        assert_eq!(response.citations.len(), contexts.len());
        for (citation, context) in response.citations.iter().zip(&contexts) {
            assert_eq!(citation.section_id, context.metadata.section_id);
            assert_eq!(citation.relevance_score, context.score);
        }
    }

    #[tokio::test]
    async fn confidence_is_max_context_score() {
        let generator = AnswerGenerator::new(FakeBackend::answering("Answer."));
        let contexts = vec![context("chapter-01#a", 0.61), context("chapter-01#b", 0.82)];

        let response = generator
            .generate(&request("question", Language::En), &contexts)
            .await;

        assert_eq!(response.confidence, 0.82);
    }

    #[tokio::test]
    async fn backend_failure_clears_citations_and_reports_error() {
        let generator = AnswerGenerator::new(FakeBackend::failing("quota exceeded"));
        let contexts = vec![context("chapter-01#a", 0.9)];

        let response = generator
            .generate(&request("question", Language::En), &contexts)
            .await;

        assert!(!response.has_answer);
        assert_eq!(response.confidence, 0.0);
        assert!(response.citations.is_empty());
        assert!(response.answer.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn prompt_carries_grounding_selected_context_and_question() {
        let backend = FakeBackend::answering("Answer.");
        let generator = AnswerGenerator::new(backend);
        let mut query = request("How do humanoids balance?", Language::En);
        query.selected_context = Some("zero-moment point".to_string());

        generator
            .generate(&query, &[context("chapter-03#balance", 0.8)])
            .await;

        let calls = generator.backend.calls.lock().unwrap();
        let turns = &calls[0];
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].role, ChatRole::Model);
        assert_eq!(turns[0].text, language_pack(Language::En).system_prompt);
        assert_eq!(turns[1].text, language_pack(Language::En).acknowledgment);

        let prompt = &turns[2].text;
        assert!(prompt.contains("grounding text for chapter-03#balance"));
        assert!(prompt.contains("zero-moment point"));
        assert!(prompt.contains("How do humanoids balance?"));
        assert!(prompt.contains("[From: Physical AI > Overview]"));
    }
}
