//! Health and pipeline diagnostics endpoints.
//!
//! `GET /health` is a liveness probe. `POST /diagnostics/stream` actively
//! exercises the event stream: it describes the backing stream and submits
//! a marker record, reporting each check separately.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shoprelay_nats::{Envelope, EventTopic};

use crate::service::{ServiceState, SharedStreamSink};

/// Tracing target for diagnostics.
const TRACING_TARGET: &str = "shoprelay_server::handler::diagnostics";

/// Shop identifier used for diagnostic marker records.
const DIAGNOSTIC_SHOP: &str = "diagnostics.internal";

/// Liveness response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the server can respond at all.
    pub status: String,
    /// Server time at response.
    pub timestamp: Timestamp,
}

/// One named diagnostic check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    /// Check name.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable detail, the error message on failure.
    pub detail: String,
}

/// Response body for the stream diagnostics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    /// True when every check passed.
    pub healthy: bool,
    /// Individual check results.
    pub checks: Vec<DiagnosticCheck>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Timestamp::now(),
    })
}

#[tracing::instrument(skip(stream))]
async fn diagnose_stream(
    State(stream): State<SharedStreamSink>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    let mut checks = Vec::with_capacity(2);

    match stream.health().await {
        Ok(health) => checks.push(DiagnosticCheck {
            name: "stream_info".to_string(),
            passed: true,
            detail: format!(
                "stream '{}' reachable, {} messages, {} consumers",
                health.stream, health.messages, health.consumer_count
            ),
        }),
        Err(err) => checks.push(DiagnosticCheck {
            name: "stream_info".to_string(),
            passed: false,
            detail: err.to_string(),
        }),
    }

    let marker = Envelope::new(
        EventTopic::ProductsUpdate,
        DIAGNOSTIC_SHOP,
        serde_json::json!({ "diagnostic": true }),
    );
    match stream.submit(&marker).await {
        Ok(receipt) => checks.push(DiagnosticCheck {
            name: "test_submission".to_string(),
            passed: true,
            detail: format!(
                "marker record accepted on '{}' at sequence {}",
                receipt.subject, receipt.sequence
            ),
        }),
        Err(err) => checks.push(DiagnosticCheck {
            name: "test_submission".to_string(),
            passed: false,
            detail: err.to_string(),
        }),
    }

    let healthy = checks.iter().all(|c| c.passed);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::info!(
        target: TRACING_TARGET,
        healthy = healthy,
        status_code = status.as_u16(),
        "Stream diagnostics completed"
    );

    (status, Json(DiagnosticsResponse { healthy, checks }))
}

/// Returns a [`Router`] with the health and diagnostics routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/health", get(health))
        .route("/diagnostics/stream", post(diagnose_stream))
}
