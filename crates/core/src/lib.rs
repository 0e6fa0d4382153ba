pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod generator;
pub mod indexer;
pub mod languages;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_markdown, chunk_markdown_file, MAX_CHUNK_CHARS, MIN_SECTION_CHARS};
pub use embeddings::{Embedder, HashEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, RagError, ValidationError};
pub use generation::{GeminiClient, DEFAULT_GEMINI_MODEL};
pub use generator::AnswerGenerator;
pub use indexer::{
    chunk_docs_directory, derive_point_id, discover_chapter_files, index_chunks,
    index_docs_directory,
};
pub use languages::{language_pack, Language, LanguagePack};
pub use models::{
    Citation, ContentChunk, EmbeddingMetadata, HealthReport, HealthStatus, IndexReport,
    IndexedPoint, QueryRequest, QueryResponse, RetrievedContext, ScoredPoint, SectionSummary,
};
pub use pipeline::{QueryPipeline, DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K};
pub use retriever::Retriever;
pub use stores::QdrantStore;
pub use traits::{ChatRole, ChatTurn, GenerationBackend, VectorIndex};
