//! HTTP surface: webhook handshake and delivery, plus read-only endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use futures::StreamExt;
use secrecy::SecretString;
use tokio_util::task::TaskTracker;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, debug, info, warn};

use super::verify::{HandshakeQuery, verify};
use crate::error::VerificationError;
use crate::pipeline::ResponseOrchestrator;
use crate::pipeline::parser::parse_events;
use crate::store::{ResponseRecord, ResponseStore};

/// Body returned for every accepted POST.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub verify_token: Arc<SecretString>,
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub store: Arc<dyn ResponseStore>,
    /// Background processing spawned by POST; drained at shutdown.
    pub tasks: TaskTracker,
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MissingToken => StatusCode::BAD_REQUEST,
            Self::TokenMismatch => StatusCode::FORBIDDEN,
        };
        (status, self.to_string()).into_response()
    }
}

/// GET /webhook
///
/// Echoes `hub.challenge` when `hub.verify_token` matches.
async fn handshake(
    State(state): State<AppState>,
    Query(query): Query<HandshakeQuery>,
) -> Result<String, VerificationError> {
    verify(&state.verify_token, query)
}

/// POST /webhook
///
/// Always acknowledges with 200. Parsed events are processed on a tracked
/// background task so the platform's connection can close without cancelling
/// delivery; shutdown waits for those tasks in `drain_in_flight`.
async fn receive(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match parse_events(&body) {
        Ok(events) if events.is_empty() => {
            debug!(stage = "parse", "Webhook delivery carried no messages");
        }
        Ok(events) => {
            info!(stage = "parse", count = events.len(), "Webhook delivery accepted");
            let orchestrator = Arc::clone(&state.orchestrator);
            state.tasks.spawn(async move {
                orchestrator.handle_batch(events).await;
            });
        }
        Err(e) => {
            warn!(stage = "parse", error = %e, bytes = body.len(), "Dropping webhook delivery");
        }
    }
    (StatusCode::OK, EVENT_RECEIVED)
}

async fn method_not_allowed(method: Method, uri: Uri) -> StatusCode {
    warn!(%method, path = %uri.path(), "Unsupported method on webhook route");
    StatusCode::METHOD_NOT_ALLOWED
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}

/// GET /api/responses
///
/// Every stored response, oldest first.
async fn list_responses(State(state): State<AppState>) -> Json<Vec<ResponseRecord>> {
    let records: Vec<ResponseRecord> = state.store.list_all().await.collect().await;
    Json(records)
}

/// HEAD is claimed explicitly: axum would otherwise serve it with the GET handler.
fn webhook_route() -> MethodRouter<AppState> {
    get(handshake)
        .head(method_not_allowed)
        .post(receive)
        .fallback(method_not_allowed)
}

/// Request span carrying only method and path. The query string holds the
/// verify token during handshakes.
fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!("request", method = %request.method(), path = %request.uri().path())
}

/// Close the tracker and wait up to `grace` for running tasks.
///
/// Returns `false` if tasks were still running when the grace period ended.
pub async fn drain_in_flight(tasks: &TaskTracker, grace: Duration) -> bool {
    tasks.close();
    if tasks.is_empty() {
        return true;
    }
    info!(pending = tasks.len(), "Waiting for in-flight webhook processing");
    match tokio::time::timeout(grace, tasks.wait()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(pending = tasks.len(), "Shutdown grace period elapsed with work in flight");
            false
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", webhook_route())
        .route("/webhook", webhook_route())
        .route("/health", get(health))
        .route("/api/responses", get(list_responses))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span)),
        )
        .with_state(state)
}
