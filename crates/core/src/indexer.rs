use crate::chunking::chunk_markdown_file;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::languages::Language;
use crate::models::{ContentChunk, EmbeddingMetadata, IndexReport, IndexedPoint};
use crate::traits::VectorIndex;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Deterministic point id for a chunk id: the first 8 bytes of its SHA-256
/// digest as a big-endian u64. For n indexed chunks the collision probability
/// is about n^2 / 2^65, negligible for a textbook-sized corpus. Re-ingestion
/// maps the same chunk id to the same point, so upserts overwrite in place.
pub fn derive_point_id(chunk_id: &str) -> u64 {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Finds the chapter pages of a docs tree: every `chapter-*/index.md`, in
/// path order, plus a top-level `intro.md` when present.
pub fn discover_chapter_files(docs_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(docs_dir)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() || entry.file_name() != "index.md" {
            continue;
        }

        let in_chapter_dir = entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("chapter-"));

        if in_chapter_dir {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();

    let intro = docs_dir.join("intro.md");
    if intro.is_file() {
        files.push(intro);
    }

    files
}

/// Chunks every chapter page of `docs_dir` for one language.
pub fn chunk_docs_directory(
    docs_dir: &Path,
    language: Language,
) -> Result<Vec<ContentChunk>, IngestError> {
    let files = discover_chapter_files(docs_dir);
    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no chapter pages found in {}",
            docs_dir.display()
        )));
    }

    let mut chunks = Vec::new();
    for path in files {
        let file_chunks = chunk_markdown_file(&path, language)?;
        tracing::debug!(path = %path.display(), sections = file_chunks.len(), "parsed page");
        chunks.extend(file_chunks);
    }

    Ok(chunks)
}

/// Embeds and upserts chunks, creating the collection first if needed.
pub async fn index_chunks<E, V>(
    embedder: &E,
    index: &V,
    chunks: &[ContentChunk],
) -> Result<IndexReport, IngestError>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    let started = Instant::now();

    index.ensure_collection(embedder.dimensions()).await?;

    if chunks.is_empty() {
        return Ok(IndexReport {
            chunks_indexed: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        });
    }

    // Headers are embedded with the body so section titles contribute to
    // similarity.
    let texts: Vec<String> = chunks
        .iter()
        .map(|chunk| {
            format!(
                "{}: {}\n{}",
                chunk.chapter_title, chunk.section_title, chunk.content
            )
        })
        .collect();
    let vectors = embedder.embed_batch(&texts).await?;

    let points: Vec<IndexedPoint> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexedPoint {
            id: derive_point_id(&chunk.chunk_id),
            vector,
            payload: EmbeddingMetadata::from_chunk(chunk),
        })
        .collect();

    index.upsert(&points).await?;

    tracing::info!(chunks = points.len(), "indexing complete");
    Ok(IndexReport {
        chunks_indexed: points.len(),
        duration_ms: started.elapsed().as_millis() as u64,
        completed_at: Utc::now(),
    })
}

/// Full offline ingestion for one language: discover, chunk, embed, upsert.
pub async fn index_docs_directory<E, V>(
    embedder: &E,
    index: &V,
    docs_dir: &Path,
    language: Language,
) -> Result<IndexReport, IngestError>
where
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    let chunks = chunk_docs_directory(docs_dir, language)?;
    index_chunks(embedder, index, &chunks).await
}
