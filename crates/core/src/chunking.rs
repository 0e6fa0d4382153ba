use crate::error::IngestError;
use crate::languages::{docs_url_path, intro_title, Language};
use crate::models::ContentChunk;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Chunk content is truncated to this many characters before embedding.
pub const MAX_CHUNK_CHARS: usize = 2000;
/// Sections shorter than this carry too little signal to index.
pub const MIN_SECTION_CHARS: usize = 50;

/// Splits one chapter page into per-section chunks.
///
/// The page is cut at `## ` headers; text before the first header becomes the
/// intro section. Chunk ids are `{language}_{chapter_id}_{ordinal}` with the
/// ordinal taken from the header position, so re-parsing identical input
/// yields identical ids.
pub fn chunk_markdown(
    content: &str,
    chapter_id: &str,
    language: Language,
) -> Result<Vec<ContentChunk>, IngestError> {
    let (frontmatter, body) = split_frontmatter(content);
    let chapter_title = frontmatter
        .get("title")
        .cloned()
        .unwrap_or_else(|| chapter_id.to_string());
    let url_path = docs_url_path(language, chapter_id);

    let header = Regex::new(r"(?m)^## ")?;
    let mut chunks = Vec::new();

    for (ordinal, section) in header.split(body).enumerate() {
        if section.trim().is_empty() {
            continue;
        }

        let (section_title, section_content) = if ordinal == 0 {
            (intro_title(language).to_string(), section.trim().to_string())
        } else {
            match section.split_once('\n') {
                Some((title, rest)) => (title.trim().to_string(), rest.trim().to_string()),
                None => (section.trim().to_string(), String::new()),
            }
        };

        if section_content.chars().count() < MIN_SECTION_CHARS {
            continue;
        }

        chunks.push(ContentChunk {
            chunk_id: format!("{}_{}_{}", language.code(), chapter_id, ordinal),
            chapter_id: chapter_id.to_string(),
            chapter_title: chapter_title.clone(),
            section_title,
            content: truncate_chars(&section_content, MAX_CHUNK_CHARS),
            url_path: url_path.clone(),
            language,
            ordinal,
        });
    }

    Ok(chunks)
}

/// Reads and chunks one markdown file; the chapter id comes from the parent
/// directory name.
pub fn chunk_markdown_file(
    path: &Path,
    language: Language,
) -> Result<Vec<ContentChunk>, IngestError> {
    let chapter_id = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("no parent directory for {}", path.display()))
        })?
        .to_string();

    let content = std::fs::read_to_string(path)?;
    chunk_markdown(&content, &chapter_id, language)
}

fn split_frontmatter(content: &str) -> (HashMap<String, String>, &str) {
    let mut frontmatter = HashMap::new();

    if let Some(stripped) = content.strip_prefix("---") {
        if let Some((raw_frontmatter, body)) = stripped.split_once("---") {
            for line in raw_frontmatter.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    frontmatter.insert(
                        key.trim().to_string(),
                        value.trim().trim_matches(['"', '\'']).to_string(),
                    );
                }
            }
            return (frontmatter, body);
        }
    }

    (frontmatter, content)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "---\n\
title: \"Physical AI Foundations\"\n\
---\n\
This chapter introduces the field of physical artificial intelligence and why it matters.\n\
\n\
## What is Physical AI?\n\
Physical AI is the study of intelligent systems that sense and act in the real world, \
combining perception, planning and control.\n\
\n\
## Tiny\n\
too short\n\
\n\
## Actuators\n\
Actuators convert energy into motion and are the muscles of any humanoid robot platform.\n";

    #[test]
    fn frontmatter_title_becomes_chapter_title() {
        let chunks = chunk_markdown(PAGE, "chapter-01", Language::En).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.chapter_title == "Physical AI Foundations"));
    }

    #[test]
    fn sections_split_on_headers_with_intro_first() {
        let chunks = chunk_markdown(PAGE, "chapter-01", Language::En).unwrap();
        let titles: Vec<_> = chunks.iter().map(|chunk| chunk.section_title.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "What is Physical AI?", "Actuators"]);
    }

    #[test]
    fn short_sections_are_skipped() {
        let chunks = chunk_markdown(PAGE, "chapter-01", Language::En).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.section_title != "Tiny"));
    }

    #[test]
    fn chunk_ids_are_deterministic_across_reparses() {
        let first: Vec<_> = chunk_markdown(PAGE, "chapter-01", Language::En).unwrap()
            .into_iter()
            .map(|chunk| chunk.chunk_id)
            .collect();
        let second: Vec<_> = chunk_markdown(PAGE, "chapter-01", Language::En).unwrap()
            .into_iter()
            .map(|chunk| chunk.chunk_id)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "en_chapter-01_0");
        // Ordinals track header positions, so the skipped section leaves a gap.
        assert_eq!(first[2], "en_chapter-01_3");
    }

    #[test]
    fn content_is_truncated_on_character_boundaries() {
        let long_section = format!(
            "## Long\n{}\n",
            "ک".repeat(MAX_CHUNK_CHARS + 100) // multi-byte characters
        );
        let chunks = chunk_markdown(&long_section, "chapter-02", Language::Ur).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.chars().count(), MAX_CHUNK_CHARS);
    }

    #[test]
    fn urdu_chunks_get_locale_prefixed_urls() {
        let chunks = chunk_markdown(PAGE, "chapter-01", Language::Ur).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.url_path == "/ur/docs/chapter-01"));
        assert!(chunks[0].chunk_id.starts_with("ur_"));
    }

    #[test]
    fn page_without_frontmatter_uses_chapter_id_as_title() {
        let body = "Some intro text that is comfortably longer than the fifty character minimum.\n";
        let chunks = chunk_markdown(body, "chapter-09", Language::En).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chapter_title, "chapter-09");
    }
}
