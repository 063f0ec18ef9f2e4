//! Breach catalog handlers.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, instrument};

use crate::api::error::ApiError;
use crate::api::types::{BreachListResponse, FieldInfo, FieldsResponse, StatisticsResponse};
use crate::domain::{BreachName, BreachSummary};
use crate::metrics::metric_names;
use crate::server::AppState;

/// GET /api/v1/breaches - Full catalog, newest breach first.
#[instrument(skip(state))]
pub async fn list_breaches(
    State(state): State<AppState>,
) -> Result<Json<BreachListResponse>, ApiError> {
    let breaches = state.catalog.list_breaches().await?;
    state
        .metrics
        .set_gauge(metric_names::CATALOG_BREACHES, breaches.len() as u64)
        .await;

    let breaches: Vec<BreachSummary> = breaches.iter().map(BreachSummary::from).collect();
    Ok(Json(BreachListResponse {
        count: breaches.len(),
        breaches,
    }))
}

/// GET /api/v1/breaches/:name - One catalog entry.
#[instrument(skip(state), fields(breach = %name))]
pub async fn get_breach(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreachSummary>, ApiError> {
    debug!("Getting breach metadata");
    let breach = state
        .catalog
        .get_breach_metadata(&BreachName::new(name))
        .await?;
    Ok(Json(BreachSummary::from(&breach)))
}

/// GET /api/v1/fields - Field vocabulary in use by the catalog.
#[instrument(skip(state))]
pub async fn list_fields(State(state): State<AppState>) -> Result<Json<FieldsResponse>, ApiError> {
    let fields = state
        .catalog
        .available_fields()
        .await?
        .into_iter()
        .map(|field| FieldInfo {
            field,
            sensitive: field.is_sensitive(),
        })
        .collect();
    Ok(Json(FieldsResponse { fields }))
}

/// GET /api/v1/statistics - Catalog totals and per-field breach counts.
#[instrument(skip(state))]
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let breaches = state.catalog.list_breaches().await?;
    Ok(Json(StatisticsResponse::from_catalog(&breaches)))
}
