// src/api/handlers.rs

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tokio::sync::mpsc::error::TrySendError;

use crate::api::{auth, ApiState, ErrorResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// POST /slack/events — Slack Events API receiver.
///
/// Answers the URL verification handshake and enqueues event callbacks for
/// the pipeline worker. Acknowledges immediately; processing happens
/// off-request.
pub async fn slack_events(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth::check_signature(&state, &headers, &body)?;

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")))?;

    match payload["type"].as_str() {
        Some("url_verification") => {
            let challenge = payload["challenge"].as_str().unwrap_or_default();
            Ok(Json(serde_json::json!({ "challenge": challenge })))
        }
        Some("event_callback") => {
            if let Some(retry) = headers
                .get("x-slack-retry-num")
                .and_then(|v| v.to_str().ok())
            {
                tracing::debug!(retry, "Slack redelivery");
            }
            match state.events.try_send(payload) {
                Ok(()) => Ok(Json(serde_json::json!({ "ok": true }))),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Event queue full, asking Slack to retry later");
                    Err(error(StatusCode::SERVICE_UNAVAILABLE, "Event queue full"))
                }
                Err(TrySendError::Closed(_)) => Err(error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Event worker stopped",
                )),
            }
        }
        other => {
            tracing::debug!(kind = ?other, "Ignoring Slack payload");
            Ok(Json(serde_json::json!({ "ok": true })))
        }
    }
}

/// GET /health — Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
