use crate::error::ValidationError;
use crate::languages::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const QUESTION_MIN_CHARS: usize = 3;
pub const QUESTION_MAX_CHARS: usize = 1000;
pub const SELECTED_CONTEXT_MAX_CHARS: usize = 2000;
pub const SNIPPET_MAX_CHARS: usize = 300;

/// One bounded unit of textbook content produced at ingestion time.
///
/// `chunk_id` is deterministic for `(language, chapter_id, ordinal)`, so
/// re-ingesting the same source yields the same logical identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    pub chunk_id: String,
    pub chapter_id: String,
    pub chapter_title: String,
    pub section_title: String,
    pub content: String,
    pub url_path: String,
    pub language: Language,
    pub ordinal: usize,
}

/// Payload stored alongside each vector, and the retrieval-time view of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingMetadata {
    pub section_id: String,
    pub chunk_index: u64,
    pub text: String,
    pub token_count: u64,
    pub chapter_title: String,
    pub section_title: String,
    pub url: Option<String>,
    pub language: Language,
}

impl EmbeddingMetadata {
    /// Reconstructs metadata from a raw payload, substituting defaults for
    /// absent fields. Unknown language codes fall back to English.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            section_id: field("section_id"),
            chunk_index: payload
                .get("chunk_index")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            text: field("text"),
            token_count: payload
                .get("token_count")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            chapter_title: field("chapter_title"),
            section_title: field("section_title"),
            url: payload
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            language: payload
                .get("language")
                .and_then(Value::as_str)
                .and_then(Language::from_code)
                .unwrap_or(Language::En),
        }
    }

    pub fn from_chunk(chunk: &ContentChunk) -> Self {
        Self {
            section_id: format!("{}#{}", chunk.chapter_id, anchor_slug(&chunk.section_title)),
            chunk_index: chunk.ordinal as u64,
            text: chunk.content.clone(),
            token_count: chunk.content.split_whitespace().count() as u64,
            chapter_title: chunk.chapter_title.clone(),
            section_title: chunk.section_title.clone(),
            url: Some(chunk.url_path.clone()),
            language: chunk.language,
        }
    }
}

/// Lowercased, dash-separated anchor for a section heading, matching the
/// site's heading anchors.
pub fn anchor_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut previous_dash = true;
    for character in title.chars() {
        if character.is_alphanumeric() {
            slug.extend(character.to_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// One retrieved chunk paired with its similarity score. Lives only for the
/// duration of a single query.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub metadata: EmbeddingMetadata,
    pub score: f32,
}

/// A raw hit from the vector index before metadata reconstruction.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    pub payload: Value,
    pub score: f32,
}

/// A point as written to the vector index.
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: EmbeddingMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub section_id: String,
    pub section_title: String,
    pub chapter_title: String,
    pub url: String,
    pub snippet: String,
    pub relevance_score: f32,
}

impl Citation {
    pub fn from_context(context: &RetrievedContext) -> Self {
        let metadata = &context.metadata;
        let url = metadata.url.clone().unwrap_or_else(|| {
            format!("/docs/{}", metadata.section_id.replace('#', "/"))
        });

        Self {
            section_id: metadata.section_id.clone(),
            section_title: metadata.section_title.clone(),
            chapter_title: metadata.chapter_title.clone(),
            url,
            snippet: metadata.text.chars().take(SNIPPET_MAX_CHARS).collect(),
            relevance_score: context.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub selected_context: Option<String>,
    #[serde(default)]
    pub language: Language,
}

impl QueryRequest {
    /// Boundary validation; a request that fails here never enters the
    /// pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let question_chars = self.question.chars().count();
        if !(QUESTION_MIN_CHARS..=QUESTION_MAX_CHARS).contains(&question_chars) {
            return Err(ValidationError::QuestionLength {
                min: QUESTION_MIN_CHARS,
                max: QUESTION_MAX_CHARS,
                actual: question_chars,
            });
        }

        if let Some(selected) = &self.selected_context {
            let selected_chars = selected.chars().count();
            if selected_chars > SELECTED_CONTEXT_MAX_CHARS {
                return Err(ValidationError::SelectedContextLength {
                    max: SELECTED_CONTEXT_MAX_CHARS,
                    actual: selected_chars,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub has_answer: bool,
    pub confidence: f32,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSummary {
    pub id: String,
    pub title: String,
    pub chapter_id: String,
    pub chapter_title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub vector_index_connected: bool,
    pub generator_available: bool,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub duration_ms: u64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
