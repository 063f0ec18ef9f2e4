//! Breach search handlers.

use axum::extract::State;
use axum::Json;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::api::error::{validation_error, ApiError, ErrorCode};
use crate::api::types::{
    supported_fields, BreachCheckRequest, BreachCheckResponse, CombinedSearchRequest,
    SearchModeParam, SearchResponse, SensitiveCheckRequest, SensitiveCheckResponse,
};
use crate::api::utils::ApiJson;
use crate::domain::{summarize_candidate, summarize_match, SearchRequest, SensitiveSearchRequest};
use crate::infra::BreachError;
use crate::metrics::{metric_names, SearchMode, SearchOutcome};
use crate::server::AppState;

/// POST /api/v1/breach-check - Exact correlation of hashed identity fields.
#[instrument(skip(state, request), fields(fields = request.fields.len()))]
pub async fn breach_check(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BreachCheckRequest>,
) -> Result<Json<BreachCheckResponse>, ApiError> {
    let search_fields = request.fields.keys().cloned().collect();
    let response = run_exact(&state, search_fields, request.to_search_request()).await?;
    Ok(Json(response))
}

/// POST /api/v1/sensitive-check - k-anonymity prefix lookup.
#[instrument(skip(state, request), fields(field = %request.field))]
pub async fn sensitive_check(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SensitiveCheckRequest>,
) -> Result<Json<SensitiveCheckResponse>, ApiError> {
    let search = SensitiveSearchRequest::new(request.field, request.hash_prefix);
    let response = run_sensitive(&state, search).await?;
    Ok(Json(response))
}

/// POST /api/v1/search - Combined search, `mode` selects the correlator.
#[instrument(skip(state, request), fields(mode = %request.mode, fields = request.fields.len()))]
pub async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CombinedSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let mode = request.mode().ok_or_else(|| {
        ApiError::new(
            ErrorCode::InvalidSearchMode,
            format!(
                "Unknown search mode {:?}, expected \"personal\" or \"sensitive\"",
                request.mode
            ),
        )
    })?;

    match mode {
        SearchModeParam::Personal => {
            let search_fields = request.fields.keys().cloned().collect();
            let search = supported_fields(&request.fields);
            let response = run_exact(&state, search_fields, search).await?;
            Ok(Json(SearchResponse::Personal(response)))
        }
        SearchModeParam::Sensitive => {
            let mut entries = request.fields.into_iter();
            let search = match (entries.next(), entries.next()) {
                (None, _) => SensitiveSearchRequest::new("", ""),
                (Some((field, prefix)), None) => SensitiveSearchRequest::new(field, prefix),
                (Some(_), Some(_)) => {
                    return Err(validation_error(
                        "fields",
                        "Sensitive search takes exactly one field",
                    ))
                }
            };
            let response = run_sensitive(&state, search).await?;
            Ok(Json(SearchResponse::Sensitive(response)))
        }
    }
}

async fn run_exact(
    state: &AppState,
    search_fields: Vec<String>,
    search: SearchRequest,
) -> Result<BreachCheckResponse, ApiError> {
    let start = Instant::now();
    let correlation = match state.exact.find_matches(&search).await {
        Ok(correlation) => correlation,
        Err(e) => return Err(record_failure(state, e).await),
    };

    state
        .metrics
        .record_search(
            SearchMode::Exact,
            &SearchOutcome {
                results: correlation.results.len(),
                truncated: correlation.truncated,
                elapsed_secs: start.elapsed().as_secs_f64(),
            },
        )
        .await;
    info!(
        matches = correlation.results.len(),
        truncated = correlation.truncated,
        "Breach check served"
    );

    Ok(BreachCheckResponse {
        found: !correlation.is_empty(),
        search_fields,
        truncated: correlation.truncated,
        exact_matches: correlation.results.iter().map(summarize_match).collect(),
    })
}

async fn run_sensitive(
    state: &AppState,
    search: SensitiveSearchRequest,
) -> Result<SensitiveCheckResponse, ApiError> {
    let start = Instant::now();
    let correlation = match state.sensitive.search(&search).await {
        Ok(correlation) => correlation,
        Err(e) => return Err(record_failure(state, e).await),
    };

    state
        .metrics
        .record_search(
            SearchMode::Sensitive,
            &SearchOutcome {
                results: correlation.results.len(),
                truncated: correlation.truncated,
                elapsed_secs: start.elapsed().as_secs_f64(),
            },
        )
        .await;
    info!(
        breaches = correlation.results.len(),
        truncated = correlation.truncated,
        "Sensitive check served"
    );

    let search_fields = if search.field.is_empty() {
        Vec::new()
    } else {
        vec![search.field]
    };

    Ok(SensitiveCheckResponse {
        found: !correlation.is_empty(),
        search_fields,
        truncated: correlation.truncated,
        candidate_breaches: correlation.results.iter().map(summarize_candidate).collect(),
    })
}

async fn record_failure(state: &AppState, err: BreachError) -> ApiError {
    if err.is_client_error() {
        state.metrics.inc_counter(metric_names::CLIENT_ERRORS).await;
    } else {
        warn!(error = %err, "Search failed");
        state.metrics.inc_counter(metric_names::SERVER_ERRORS).await;
    }
    ApiError::from(err)
}
