use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    chat::ChatGuru,
    config::Latency,
    error::PatternError,
    models::{ChatMessage, ChatRequest, GenerateBody, GenerationRequest, Pattern, SavedPattern, ShareLink, SharedPattern},
    pdf::generate_pdf,
    source::PatternSource,
    store::PatternStore,
    tracker::SubmissionTracker,
};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn PatternSource>,
    pub store: Arc<dyn PatternStore>,
    pub tracker: Arc<SubmissionTracker>,
    pub guru: Arc<ChatGuru>,
    pub public_base_url: String,
    pub latency: Latency,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/patterns", post(generate_pattern))
        .route("/api/patterns/saved", get(list_saved).post(save_pattern))
        .route("/api/patterns/saved/:id", get(get_saved).delete(delete_saved))
        .route("/api/patterns/saved/:id/pdf", get(export_pdf))
        .route("/api/patterns/shared", post(share_pattern))
        .route("/api/patterns/shared/:id", get(get_shared))
        .route("/api/chat", get(chat_greeting).post(chat_reply))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backend: &'static str,
    pub latency: Latency,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health { status: "ok", backend: state.source.name(), latency: state.latency })
}

pub async fn generate_pattern(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<Pattern>, PatternError> {
    let session = body.session.clone().filter(|s| !s.trim().is_empty());
    let request = GenerationRequest::try_from(body)?;
    let ticket = session.as_deref().map(|s| state.tracker.begin(s));

    tracing::info!("🚀 Generating {} {} ({}) via {}", request.craft, request.item, request.difficulty, state.source.name());
    let outcome = state.source.generate(&request).await;

    if let Some(ticket) = ticket {
        let current = state.tracker.is_current(&ticket);
        state.tracker.finish(&ticket);
        if !current {
            return Err(PatternError::Superseded(format!(
                "session {} submitted a newer request (#{} is stale)",
                ticket.session, ticket.seq
            )));
        }
    }
    let pattern = outcome?;
    tracing::info!("✅ Pattern '{}' ready", pattern.title);
    Ok(Json(pattern))
}

pub async fn save_pattern(
    State(state): State<AppState>,
    Json(pattern): Json<Pattern>,
) -> Result<(StatusCode, Json<SavedPattern>), PatternError> {
    pattern.check_invariants()?;
    Ok((StatusCode::CREATED, Json(state.store.save(pattern))))
}

pub async fn list_saved(State(state): State<AppState>) -> Json<Vec<SavedPattern>> {
    Json(state.store.saved())
}

pub async fn get_saved(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SavedPattern>, PatternError> {
    state.store.get_saved(id).map(Json).ok_or_else(|| PatternError::NotFound(format!("saved pattern {id}")))
}

pub async fn delete_saved(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, PatternError> {
    if state.store.delete_saved(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PatternError::NotFound(format!("saved pattern {id}")))
    }
}

pub async fn export_pdf(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Response, PatternError> {
    let saved = state.store.get_saved(id).ok_or_else(|| PatternError::NotFound(format!("saved pattern {id}")))?;
    let pdf_bytes = generate_pdf(&saved.pattern)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"pattern_{}.pdf\"", id)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, pdf_bytes).into_response())
}

pub async fn share_pattern(
    State(state): State<AppState>,
    Json(pattern): Json<Pattern>,
) -> Result<(StatusCode, Json<ShareLink>), PatternError> {
    pattern.check_invariants()?;
    let shared = state.store.share(pattern);
    let link = ShareLink {
        url: format!("{}/pattern/{}", state.public_base_url, shared.id),
        id: shared.id,
        shared_at: shared.shared_at,
    };
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get_shared(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<SharedPattern>, PatternError> {
    state.store.get_shared(&id).map(Json).ok_or_else(|| PatternError::NotFound(format!("shared pattern {id}")))
}

pub async fn chat_greeting(State(state): State<AppState>) -> Json<ChatMessage> {
    Json(state.guru.greeting())
}

pub async fn chat_reply(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, PatternError> {
    if body.message.trim().is_empty() {
        return Err(PatternError::InvalidArgument("message must not be empty".into()));
    }
    Ok(Json(state.guru.reply(&body.history, &body.message).await))
}
