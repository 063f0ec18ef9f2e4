//! Health, readiness and metrics handlers

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::api::error::{ApiError, ErrorCode};
use crate::server::AppState;

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Response for the readiness endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub catalog: ComponentStatus,
    pub uptime_secs: u64,
}

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Reachable but slow
    Degraded,
    Unhealthy,
}

/// Individual component status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: HealthStatus,
    pub breaches: usize,
    pub response_time_ms: u64,
}

/// Classify a catalog round trip by its latency.
fn status_for_latency(response_time_ms: u64) -> HealthStatus {
    if response_time_ms < 100 {
        HealthStatus::Healthy
    } else if response_time_ms < 1000 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

/// Liveness check, no dependency checks.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        service: "breach-radar",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check: the breach catalog must answer.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let start = Instant::now();
    match state.catalog.list_breaches().await {
        Ok(breaches) => {
            let response_time_ms = start.elapsed().as_millis() as u64;
            let status = status_for_latency(response_time_ms);
            Ok(Json(ReadinessResponse {
                status,
                catalog: ComponentStatus {
                    name: "breach_catalog",
                    status,
                    breaches: breaches.len(),
                    response_time_ms,
                },
                uptime_secs: state.metrics.uptime_seconds(),
            }))
        }
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            Err(ApiError::new(
                ErrorCode::ServiceUnavailable,
                format!("Breach catalog unavailable: {}", e),
            ))
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus().await,
    )
}
