use axum::extract::{Query, Request, State};
use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use textbook_rag_core::{
    GeminiClient, HashEmbedder, HealthReport, QdrantStore, QueryPipeline, QueryRequest,
    QueryResponse, SectionSummary,
};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Concrete pipeline the server runs: hashing embedder, Qdrant, Gemini.
pub type ServicePipeline = QueryPipeline<HashEmbedder, QdrantStore, GeminiClient>;

pub struct ServerState {
    pipeline: ServicePipeline,
    allowed_origins: Vec<String>,
}

impl ServerState {
    pub fn new(pipeline: ServicePipeline, allowed_origins: Vec<String>) -> Self {
        Self {
            pipeline,
            allowed_origins,
        }
    }
}

pub type SharedState = Arc<ServerState>;

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/query", post(query))
        .route("/v1/sections", get(sections))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

pub async fn serve(state: SharedState, bind: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid bind address {bind}"))?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "serving textbook RAG API");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn service_unavailable(error: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: "SERVICE_UNAVAILABLE".to_string(),
            message: error.to_string(),
        }),
    )
}

fn invalid_request(error: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "INVALID_REQUEST".to_string(),
            message: error.to_string(),
        }),
    )
}

async fn health(State(state): State<SharedState>) -> Json<HealthReport> {
    Json(state.pipeline.health().await)
}

async fn query(
    State(state): State<SharedState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    // Malformed requests never reach the pipeline.
    request.validate().map_err(invalid_request)?;

    state
        .pipeline
        .process_query(&request)
        .await
        .map(Json)
        .map_err(|err| {
            error!(%err, "query pipeline failed");
            service_unavailable(format!("Failed to process query: {err}"))
        })
}

#[derive(Debug, Deserialize)]
struct SectionsParams {
    chapter_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SectionsResponse {
    sections: Vec<SectionSummary>,
    total: usize,
}

async fn sections(
    State(state): State<SharedState>,
    Query(params): Query<SectionsParams>,
) -> Result<Json<SectionsResponse>, ApiError> {
    let sections = state
        .pipeline
        .list_sections(params.chapter_id.as_deref())
        .await
        .map_err(|err| {
            error!(%err, "section listing failed");
            service_unavailable(format!("Failed to list sections: {err}"))
        })?;

    let total = sections.len();
    Ok(Json(SectionsResponse { sections, total }))
}

/// Allow-list CORS: echoes the origin back when it is configured, answers
/// preflights directly.
async fn cors(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let allowed_origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .filter(|origin| state.allowed_origins.iter().any(|allowed| allowed == origin))
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if let Some(origin) = allowed_origin {
        if let Ok(origin_value) = HeaderValue::from_str(&origin) {
            let headers = response.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }

    response
}
