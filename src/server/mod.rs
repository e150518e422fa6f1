//! HTTP API
//!
//! Three endpoints mirror the intake contract: `POST /api/add-page` for
//! single-record ingestion, `POST /api/ask-bot-smart` for a streamed
//! retrieval-grounded answer, and `POST /api/ask-bot` for a streamed
//! answer without retrieval context. Failures before streaming begins
//! return a structured `{"error": ...}` JSON body with a non-2xx status;
//! once streaming has started, an upstream failure simply ends the body.

use crate::answer::AnswerComposer;
use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use crate::retrieve::Retriever;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub ingestor: Ingestor,
    pub retriever: Retriever,
    pub composer: AnswerComposer,
    pub default_k: usize,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/add-page", post(add_page))
        .route("/api/ask-bot", post(ask_bot))
        .route("/api/ask-bot-smart", post(ask_bot_smart))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and run the HTTP API until the process is stopped
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Missing fields deserialize as empty strings so absent and empty input
/// take the same validation path (400, not an extractor rejection)
#[derive(Debug, Deserialize)]
struct AddPageRequest {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

async fn add_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddPageRequest>,
) -> Response {
    match state
        .ingestor
        .ingest(&request.url, &request.title, &request.content)
        .await
    {
        Ok(page_id) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Page and embeddings saved successfully.",
                "page_id": page_id,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    prompt: String,
}

async fn ask_bot_smart(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Response {
    let pages = match state
        .retriever
        .retrieve(&request.prompt, state.default_k)
        .await
    {
        Ok(pages) => pages,
        Err(e) => return error_response(e),
    };

    match state.composer.compose(&request.prompt, &pages).await {
        Ok(rx) => stream_response(rx),
        Err(e) => error_response(e),
    }
}

async fn ask_bot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Response {
    match state.composer.compose_direct(&request.prompt).await {
        Ok(rx) => stream_response(rx),
        Err(e) => error_response(e),
    }
}

/// Forward answer fragments as they arrive; the body ends when the
/// upstream stream does, and a disconnecting client drops the receiver,
/// which cancels the upstream request.
fn stream_response(rx: mpsc::Receiver<String>) -> Response {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|fragment| (Ok::<_, Infallible>(Bytes::from(fragment)), rx))
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}

fn error_response(error: Error) -> Response {
    let status = status_for(&error);
    (status, Json(json!({"error": error.to_string()}))).into_response()
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Api(_) | Error::Transport(_) => StatusCode::BAD_GATEWAY,
        Error::RetrievalUnavailable(_) | Error::GenerationUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&Error::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&Error::Api("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&Error::Transport("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::RetrievalUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::GenerationUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
