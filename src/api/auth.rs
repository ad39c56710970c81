// src/api/auth.rs — Slack request signature verification
//
// https://api.slack.com/authentication/verifying-requests-from-slack

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::api::{ApiState, ErrorResponse};

/// Requests older (or newer) than this are rejected as replays.
const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Verify the Slack signature if a signing secret is configured.
pub fn check_signature(
    state: &ApiState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let Some(ref secret) = state.signing_secret else {
        return Ok(());
    };

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };

    let now = chrono::Utc::now().timestamp();
    if verify_signature(
        secret,
        header(TIMESTAMP_HEADER),
        body,
        header(SIGNATURE_HEADER),
        now,
    ) {
        Ok(())
    } else {
        tracing::warn!("Rejected Slack request with invalid signature");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or missing Slack signature".into(),
            }),
        ))
    }
}

/// `signature` must be `v0=` + hex(HMAC-SHA256(secret, "v0:{timestamp}:{body}"))
/// and `timestamp` within five minutes of `now`.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if now.abs_diff(ts) > MAX_CLOCK_SKEW_SECS.unsigned_abs() {
        return false;
    }
    let Some(provided) = signature.strip_prefix("v0=") else {
        return false;
    };

    let expected = sign(secret, timestamp, body);
    constant_time_eq(provided.as_bytes(), expected.as_bytes())
}

/// Hex HMAC-SHA256 over Slack's `v0` basestring.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time byte comparison to prevent timing attacks on signatures.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
