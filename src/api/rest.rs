//! REST API endpoints for Breach Radar.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::{
    breach_check, get_breach, list_breaches, list_fields, search, sensitive_check, statistics,
};
use crate::server::AppState;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Search
        .route("/v1/breach-check", post(breach_check))
        .route("/v1/sensitive-check", post(sensitive_check))
        .route("/v1/search", post(search))
        // Catalog
        .route("/v1/breaches", get(list_breaches))
        .route("/v1/breaches/:name", get(get_breach))
        .route("/v1/fields", get(list_fields))
        .route("/v1/statistics", get(statistics))
}
