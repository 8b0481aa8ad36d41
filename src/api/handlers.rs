//! HTTP request handlers

use super::types::{
    ErrorListResponse, ErrorResponse, HealthResponse, RecentErrorsQuery, SessionResponse,
    VerifyQuery, WebhookAck,
};
use super::AppState;
use crate::messaging::inbound::WebhookEnvelope;
use crate::runtime::{ErrorRecord, SubmitOutcome};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

const DEFAULT_ERROR_LIMIT: usize = 20;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Provider verification handshake and message delivery
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        // Diagnostics
        .route("/debug/errors", get(recent_errors))
        .route("/debug/errors/:error_id", get(get_error))
        .route("/debug/sessions/:user_id", get(get_session))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let verified = matches!(
        (state.verify_token.as_deref(), query.verify_token.as_deref()),
        (Some(expected), Some(given)) if expected == given
    );
    if verified {
        tracing::info!(mode = ?query.mode, "Webhook verified");
        query.challenge.unwrap_or_default().into_response()
    } else {
        tracing::warn!(mode = ?query.mode, "Webhook verification failed");
        (StatusCode::FORBIDDEN, "Invalid verification token").into_response()
    }
}

/// Queue every message in the envelope; processing happens on the
/// per-user workers, so this returns immediately
async fn receive_webhook(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Json<WebhookAck> {
    let envelope: WebhookEnvelope = match serde_json::from_value(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook payload");
            return Json(WebhookAck::error(format!("Invalid message format: {e}")));
        }
    };
    if !envelope.is_business_account() {
        tracing::warn!(object = %envelope.object, "Ignoring webhook for unexpected object");
        return Json(WebhookAck::error("Invalid object"));
    }

    let messages = envelope.normalize();
    if messages.is_empty() {
        let statuses = envelope.status_count();
        tracing::debug!(statuses, "Webhook without messages");
        let message = if statuses > 0 {
            "Status update acknowledged"
        } else {
            "No messages to process"
        };
        return Json(WebhookAck::success(message));
    }

    let mut queued = 0;
    for message in &messages {
        let outcome = state.engine.submit(&message.sender_id, &message.text);
        tracing::info!(user_id = %message.sender_id, outcome = ?outcome, "Inbound message");
        if outcome != SubmitOutcome::Rejected {
            queued += 1;
        }
    }
    Json(WebhookAck::success(format!(
        "Queued {queued} of {} messages",
        messages.len()
    )))
}

// ============================================================
// Health and diagnostics
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_workers: state.engine.active_workers(),
        pending_messages: state.engine.pending_messages(),
        sessions: state.engine.store().session_count(),
        recorded_errors: state.engine.errors().count(),
    })
}

async fn recent_errors(
    State(state): State<AppState>,
    Query(query): Query<RecentErrorsQuery>,
) -> Json<ErrorListResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_ERROR_LIMIT);
    Json(ErrorListResponse {
        errors: state.engine.errors().recent(limit),
    })
}

async fn get_error(
    State(state): State<AppState>,
    Path(error_id): Path<String>,
) -> Result<Json<ErrorRecord>, AppError> {
    state
        .engine
        .errors()
        .get(&error_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No error record {error_id}")))
}

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    state
        .engine
        .store()
        .snapshot(&user_id)
        .map(|session| Json(SessionResponse { session }))
        .ok_or_else(|| AppError::NotFound(format!("No session for {user_id}")))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
