use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::updates::{Inbound, Update};

#[derive(Clone)]
pub struct WebhookState {
    /// Path secret; only updates posted to `/webhook/<secret>` are accepted
    pub secret: String,
    pub tx: mpsc::Sender<Inbound>,
}

/// Path Telegram should post updates to, relative to the public base URL.
pub fn webhook_path(secret: &str) -> String {
    format!("/webhook/{}", secret)
}

/// Build the Axum router for the webhook endpoint.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook/:secret", post(update_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// GET /health
async fn health_handler() -> &'static str {
    "ok"
}

/// POST /webhook/:secret
async fn update_handler(
    State(state): State<Arc<WebhookState>>,
    Path(secret): Path<String>,
    Json(update): Json<Update>,
) -> StatusCode {
    if secret != state.secret {
        return StatusCode::NOT_FOUND;
    }
    if let Some(inbound) = Inbound::from_update(&update) {
        if state.tx.send(inbound).await.is_err() {
            warn!("Command channel closed, dropping update {}", update.update_id);
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}
