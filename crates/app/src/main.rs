mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use textbook_rag_core::{
    index_docs_directory, AnswerGenerator, GeminiClient, HashEmbedder, Language, QdrantStore,
    QueryPipeline, Retriever, VectorIndex, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_GEMINI_MODEL,
    DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "textbook-rag-server", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant API key (omit for unsecured local instances)
    #[arg(long, env = "QDRANT_API_KEY")]
    qdrant_api_key: Option<String>,

    /// Qdrant collection holding the textbook chunks
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "textbook_chunks")]
    collection: String,

    /// Embedding vector dimension; must match the indexed collection
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Gemini API key; without it the service reports degraded health
    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: Option<String>,

    /// Gemini model identifier
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (health, query, sections).
    Serve {
        /// Address to bind the HTTP server to (host:port).
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
        bind: String,

        /// Allowed CORS origins, comma-separated.
        #[arg(
            long,
            env = "ALLOWED_ORIGINS",
            default_value = "http://localhost:3000,http://127.0.0.1:3000"
        )]
        allowed_origins: String,
    },
    /// Chunk and index a docs tree into the vector collection.
    Index {
        /// Root of the docs tree (chapter-*/index.md pages plus intro.md).
        #[arg(long)]
        docs_dir: String,

        /// Content language of this tree.
        #[arg(long, default_value = "en")]
        language: String,

        /// Drop the collection before indexing.
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Run a retrieval-only query and print the ranked hits.
    Search {
        /// Question text.
        #[arg(long)]
        query: String,

        /// Number of candidates to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Minimum similarity score.
        #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
        score_threshold: f32,

        /// Query language.
        #[arg(long, default_value = "en")]
        language: String,
    },
}

fn parse_language(code: &str) -> anyhow::Result<Language> {
    Language::from_code(code)
        .with_context(|| format!("unsupported language code {code:?} (expected en or ur)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let app_version = env!("CARGO_PKG_VERSION");

    let embedder = HashEmbedder::new(cli.embedding_dimensions);
    let store = QdrantStore::new(
        &cli.qdrant_url,
        cli.qdrant_api_key.clone(),
        &cli.collection,
        cli.embedding_dimensions,
    )
    .context("invalid qdrant URL")?;

    info!(
        version = app_version,
        collection = %cli.collection,
        started_at = %Utc::now().to_rfc3339(),
        "textbook-rag boot"
    );

    match cli.command {
        Command::Serve {
            bind,
            allowed_origins,
        } => {
            let gemini = GeminiClient::new(cli.gemini_api_key.clone(), &cli.gemini_model)
                .context("failed to build generation client")?;
            let pipeline = QueryPipeline::new(
                Retriever::new(embedder, store),
                AnswerGenerator::new(gemini),
                app_version,
            );

            let state = Arc::new(server::ServerState::new(
                pipeline,
                server::parse_origins(&allowed_origins),
            ));
            server::serve(state, &bind).await?;
        }
        Command::Index {
            docs_dir,
            language,
            clear,
        } => {
            let language = parse_language(&language)?;

            if clear {
                store
                    .delete_collection()
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                info!(collection = %cli.collection, "cleared collection");
            }

            let report = index_docs_directory(
                &embedder,
                &store,
                std::path::Path::new(&docs_dir),
                language,
            )
            .await
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!(
                "{} chunks indexed into {} in {} ms",
                report.chunks_indexed, cli.collection, report.duration_ms
            );
        }
        Command::Search {
            query,
            top_k,
            score_threshold,
            language,
        } => {
            let language = parse_language(&language)?;
            let retriever = Retriever::new(embedder, store);

            let contexts = retriever
                .search(&query, top_k, score_threshold, language)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("query: {query}");
            if contexts.is_empty() {
                println!("no sections above threshold {score_threshold}");
            }
            for context in contexts {
                println!(
                    "score={:.4} section={} chapter={}",
                    context.score, context.metadata.section_id, context.metadata.chapter_title
                );
                println!("  {}", context.metadata.section_title);
                if let Some(url) = &context.metadata.url {
                    println!("  url={url}");
                }
            }
        }
    }

    Ok(())
}
