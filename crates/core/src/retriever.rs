use crate::embeddings::Embedder;
use crate::error::RagError;
use crate::languages::Language;
use crate::models::{EmbeddingMetadata, RetrievedContext, SectionSummary};
use crate::traits::VectorIndex;
use std::collections::HashSet;

const SCROLL_PAGE_SIZE: usize = 100;

/// Composes the embedder and the vector index into similarity retrieval.
pub struct Retriever<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    embedder: E,
    index: V,
    /// Known gap: the index schema does not yet carry an indexed `language`
    /// field, so by default every language is searched and the requested
    /// language is not enforced. When enabled, results are filtered by
    /// payload language after the search, which can return fewer than
    /// `top_k` hits.
    language_filter_enabled: bool,
}

impl<E, V> Retriever<E, V>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(embedder: E, index: V) -> Self {
        Self {
            embedder,
            index,
            language_filter_enabled: false,
        }
    }

    pub fn with_language_filter(mut self, enabled: bool) -> Self {
        self.language_filter_enabled = enabled;
        self
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    /// Embeds the query and returns ranked contexts above the threshold,
    /// preserving the descending-score order of the index.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
        language: Language,
    ) -> Result<Vec<RetrievedContext>, RagError> {
        let query_vector = self.embedder.embed(query).await?;
        let hits = self
            .index
            .search(&query_vector, top_k, score_threshold)
            .await?;

        let mut contexts = Vec::with_capacity(hits.len());
        for hit in hits {
            let metadata = EmbeddingMetadata::from_payload(&hit.payload);
            if self.language_filter_enabled && metadata.language != language {
                continue;
            }
            contexts.push(RetrievedContext {
                metadata,
                score: hit.score,
            });
        }

        tracing::debug!(
            query_chars = query.chars().count(),
            hits = contexts.len(),
            top_k,
            score_threshold,
            "retrieval complete"
        );

        Ok(contexts)
    }

    /// Scrolls the whole collection and returns one summary per distinct
    /// section id, first occurrence winning. `chapter_filter` restricts to
    /// sections whose id contains the given text.
    pub async fn get_all_sections(
        &self,
        chapter_filter: Option<&str>,
    ) -> Result<Vec<SectionSummary>, RagError> {
        let mut sections = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;

        loop {
            let (points, next_cursor) = self
                .index
                .scroll(chapter_filter, SCROLL_PAGE_SIZE, cursor)
                .await?;

            for point in points {
                let metadata = EmbeddingMetadata::from_payload(&point.payload);
                if metadata.section_id.is_empty() || !seen.insert(metadata.section_id.clone()) {
                    continue;
                }

                let chapter_id = metadata
                    .section_id
                    .split('#')
                    .next()
                    .unwrap_or(&metadata.section_id)
                    .to_string();

                sections.push(SectionSummary {
                    id: metadata.section_id,
                    title: metadata.section_title,
                    chapter_id,
                    chapter_title: metadata.chapter_title,
                    url: metadata.url,
                });
            }

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::models::{IndexedPoint, ScoredPoint};
    use crate::traits::ScrollPage;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FakeEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            if self.fail {
                return Err(RagError::Request("embedding backend unreachable".into()));
            }
            Ok(vec![0.5; 4])
        }
    }

    struct FakeIndex {
        hits: Vec<ScoredPoint>,
        scroll_pages: Vec<Vec<Value>>,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn ensure_collection(&self, _dimensions: usize) -> Result<(), RagError> {
            Ok(())
        }

        async fn upsert(&self, _points: &[IndexedPoint]) -> Result<(), RagError> {
            Ok(())
        }

        async fn search(
            &self,
            _query_vector: &[f32],
            top_k: usize,
            score_threshold: f32,
        ) -> Result<Vec<ScoredPoint>, RagError> {
            Ok(self
                .hits
                .iter()
                .filter(|hit| hit.score >= score_threshold)
                .take(top_k)
                .cloned()
                .collect())
        }

        async fn scroll(
            &self,
            _section_filter: Option<&str>,
            _page_size: usize,
            cursor: Option<Value>,
        ) -> Result<ScrollPage, RagError> {
            let page = cursor.and_then(|value| value.as_u64()).unwrap_or(0) as usize;
            let points = self
                .scroll_pages
                .get(page)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|payload| ScoredPoint {
                    id: 0,
                    payload,
                    score: 0.0,
                })
                .collect();

            let next = if page + 1 < self.scroll_pages.len() {
                Some(json!(page as u64 + 1))
            } else {
                None
            };

            Ok((points, next))
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn delete_collection(&self) -> Result<(), RagError> {
            Ok(())
        }
    }

    fn hit(section_id: &str, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: 1,
            payload: json!({
                "section_id": section_id,
                "text": format!("content of {section_id}"),
                "chapter_title": "Chapter",
                "section_title": "Section",
                "language": "en",
            }),
            score,
        }
    }

    #[tokio::test]
    async fn search_preserves_index_order_and_threshold() {
        let index = FakeIndex {
            hits: vec![
                hit("chapter-01#a", 0.9),
                hit("chapter-01#b", 0.7),
                hit("chapter-02#c", 0.4),
            ],
            scroll_pages: Vec::new(),
        };
        let retriever = Retriever::new(FakeEmbedder { fail: false }, index);

        let contexts = retriever
            .search("what is physical ai", 5, 0.5, Language::En)
            .await
            .unwrap();

        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].metadata.section_id, "chapter-01#a");
        assert_eq!(contexts[0].score, 0.9);
        assert_eq!(contexts[1].score, 0.7);
        assert!(contexts.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[tokio::test]
    async fn search_never_exceeds_top_k() {
        let index = FakeIndex {
            hits: (0..10).map(|n| hit(&format!("chapter-01#{n}"), 0.9)).collect(),
            scroll_pages: Vec::new(),
        };
        let retriever = Retriever::new(FakeEmbedder { fail: false }, index);

        let contexts = retriever
            .search("question", 3, 0.5, Language::En)
            .await
            .unwrap();
        assert_eq!(contexts.len(), 3);
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let index = FakeIndex {
            hits: vec![hit("chapter-01#a", 0.9)],
            scroll_pages: Vec::new(),
        };
        let retriever = Retriever::new(FakeEmbedder { fail: true }, index);

        let result = retriever.search("question", 5, 0.5, Language::En).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn language_filter_is_off_by_default() {
        let mut urdu_hit = hit("chapter-01#a", 0.8);
        urdu_hit.payload["language"] = json!("ur");
        let index = FakeIndex {
            hits: vec![urdu_hit],
            scroll_pages: Vec::new(),
        };
        let retriever = Retriever::new(FakeEmbedder { fail: false }, index);

        let contexts = retriever
            .search("question", 5, 0.5, Language::En)
            .await
            .unwrap();
        assert_eq!(contexts.len(), 1, "all languages are searched by default");
    }

    #[tokio::test]
    async fn language_filter_drops_other_languages_when_enabled() {
        let mut urdu_hit = hit("chapter-01#a", 0.8);
        urdu_hit.payload["language"] = json!("ur");
        let index = FakeIndex {
            hits: vec![urdu_hit, hit("chapter-01#b", 0.6)],
            scroll_pages: Vec::new(),
        };
        let retriever =
            Retriever::new(FakeEmbedder { fail: false }, index).with_language_filter(true);

        let contexts = retriever
            .search("question", 5, 0.5, Language::En)
            .await
            .unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].metadata.section_id, "chapter-01#b");
    }

    #[tokio::test]
    async fn sections_are_deduplicated_across_scroll_pages() {
        let payload = |section_id: &str, title: &str| {
            json!({
                "section_id": section_id,
                "section_title": title,
                "chapter_title": "Chapter One",
                "url": "/docs/chapter-01",
            })
        };

        let index = FakeIndex {
            hits: Vec::new(),
            scroll_pages: vec![
                vec![
                    payload("chapter-01#intro", "Introduction"),
                    payload("chapter-01#intro", "Duplicate of intro"),
                ],
                vec![
                    payload("chapter-01#intro", "Another duplicate"),
                    payload("chapter-02#sensors", "Sensors"),
                ],
            ],
        };
        let retriever = Retriever::new(FakeEmbedder { fail: false }, index);

        let sections = retriever.get_all_sections(None).await.unwrap();
        assert_eq!(sections.len(), 2);
        // First occurrence wins.
        assert_eq!(sections[0].id, "chapter-01#intro");
        assert_eq!(sections[0].title, "Introduction");
        assert_eq!(sections[0].chapter_id, "chapter-01");
        assert_eq!(sections[1].chapter_id, "chapter-02");
    }
}
