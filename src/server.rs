//! JSON HTTP API over the knowledge base.
//!
//! Exposes the chat and document-management surface consumed by the web
//! UI (which lives outside this crate).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question for a session |
//! | `POST` | `/documents` | Ingest a document from extracted text |
//! | `GET`  | `/stats` | Document and chunk counts |
//! | `DELETE` | `/knowledge-base` | Clear all documents |
//! | `DELETE` | `/sessions/{id}` | Clear one session's history |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "unsupported_format", "message": "…" } }
//! ```
//!
//! Transient provider failures map to 502 so clients know the request
//! itself was fine and a retry may succeed.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based chat clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::error::RagError;
use crate::knowledge::KnowledgeBase;
use crate::models::{KnowledgeBaseStats, SourceType};
use crate::synthesize::Citation;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    kb: Arc<KnowledgeBase>,
}

/// Start the HTTP server on `bind` and serve until terminated.
pub async fn run_server(kb: Arc<KnowledgeBase>, bind: &str) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/documents", post(handle_ingest))
        .route("/stats", get(handle_stats))
        .route("/knowledge-base", delete(handle_clear))
        .route("/sessions/{id}", delete(handle_clear_session))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { kb });

    println!("ragmill listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"unsupported_format"`).
    code: String,
    /// Human-readable error message, safe to show end users.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        // Transient provider failures are gateway errors; everything
        // else is the request's fault.
        let status = if err.is_transient() {
            StatusCode::BAD_GATEWAY
        } else {
            match &err {
                RagError::Configuration(_) | RagError::UnsupportedFormat(_) => {
                    StatusCode::BAD_REQUEST
                }
                RagError::OversizedInput { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                RagError::DimensionMismatch { .. } => StatusCode::CONFLICT,
                RagError::EmbeddingUnavailable(_) | RagError::Generation(_) => {
                    StatusCode::BAD_GATEWAY
                }
            }
        };
        let code = match &err {
            RagError::Configuration(_) => "bad_request",
            RagError::UnsupportedFormat(_) => "unsupported_format",
            RagError::OversizedInput { .. } => "document_too_large",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::EmbeddingUnavailable(_) => "embedding_unavailable",
            RagError::Generation(_) => "generation_failed",
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    /// Omitted on the first message; the server mints a session id and
    /// echoes it back for the client to reuse.
    session_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    answer: String,
    cited_sources: Vec<Citation>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: "message must not be empty".to_string(),
        });
    }

    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = state.kb.answer_query(&session_id, &request.message).await?;

    Ok(Json(ChatResponse {
        session_id,
        answer: response.answer,
        cited_sources: response.cited_sources,
    }))
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct IngestRequest {
    filename: String,
    /// Extracted document text (format parsing happens client-side or
    /// in the CLI loader).
    text: String,
    /// Optional explicit source type; inferred from the filename
    /// extension when omitted.
    source_type: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    document_id: String,
    chunks_created: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let source_type = match request.source_type {
        Some(label) => label,
        None => match SourceType::from_filename(&request.filename) {
            Ok(st) => st.as_str().to_string(),
            Err(err) => return Err(err.into()),
        },
    };

    let receipt = state
        .kb
        .ingest_document(&request.filename, &request.text, &source_type)
        .await?;

    Ok(Json(IngestResponse {
        document_id: receipt.document_id,
        chunks_created: receipt.chunks_created,
    }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Json<KnowledgeBaseStats> {
    Json(state.kb.get_stats())
}

// ============ DELETE /knowledge-base ============

#[derive(Serialize)]
struct ClearedResponse {
    cleared: bool,
}

async fn handle_clear(State(state): State<AppState>) -> Json<ClearedResponse> {
    state.kb.clear_knowledge_base();
    Json(ClearedResponse { cleared: true })
}

// ============ DELETE /sessions/{id} ============

async fn handle_clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ClearedResponse> {
    state.kb.clear_session(&id);
    Json(ClearedResponse { cleared: true })
}
