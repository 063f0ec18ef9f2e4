//! Request and response bodies for the REST handlers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{
    format_record_count, BreachSummary, CandidateSummary, IdentityField, MatchSummary,
    SearchRequest,
};

// ============================================================================
// Search requests
// ============================================================================

/// Body of `POST /v1/breach-check`: field name → client-side hash.
///
/// Field names stay raw strings so that unknown ones can be dropped instead
/// of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct BreachCheckRequest {
    pub fields: BTreeMap<String, String>,
}

impl BreachCheckRequest {
    /// Keep the supported fields, dropping the rest.
    pub fn to_search_request(&self) -> SearchRequest {
        supported_fields(&self.fields)
    }
}

/// Body of `POST /v1/sensitive-check`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveCheckRequest {
    pub field: String,
    pub hash_prefix: String,
}

/// Which correlator a combined search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchModeParam {
    Personal,
    Sensitive,
}

/// Body of `POST /v1/search`. In sensitive mode `fields` holds exactly one
/// `field → prefix` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedSearchRequest {
    pub mode: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl CombinedSearchRequest {
    pub fn mode(&self) -> Option<SearchModeParam> {
        match self.mode.trim().to_ascii_lowercase().as_str() {
            "personal" | "exact" => Some(SearchModeParam::Personal),
            "sensitive" => Some(SearchModeParam::Sensitive),
            _ => None,
        }
    }
}

pub(crate) fn supported_fields(fields: &BTreeMap<String, String>) -> SearchRequest {
    SearchRequest::new(fields.iter().filter_map(|(name, hash)| {
        match IdentityField::parse(name) {
            Some(field) => Some((field, hash.clone())),
            None => {
                debug!(field = %name, "Dropping unsupported search field");
                None
            }
        }
    }))
}

// ============================================================================
// Search responses
// ============================================================================

/// Exact-mode response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachCheckResponse {
    pub found: bool,
    pub search_fields: Vec<String>,
    /// Some breaches could not be checked
    pub truncated: bool,
    pub exact_matches: Vec<MatchSummary>,
}

/// Sensitive-mode response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveCheckResponse {
    pub found: bool,
    pub search_fields: Vec<String>,
    pub truncated: bool,
    pub candidate_breaches: Vec<CandidateSummary>,
}

/// Response of the combined search, shaped like the mode's dedicated endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Personal(BreachCheckResponse),
    Sensitive(SensitiveCheckResponse),
}

// ============================================================================
// Catalog responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachListResponse {
    pub breaches: Vec<BreachSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsResponse {
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub field: IdentityField,
    /// Sensitive fields are only searchable by hash prefix
    pub sensitive: bool,
}

/// Number of breaches exposing one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeCount {
    pub field: IdentityField,
    pub breaches: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub total_breaches: usize,
    /// Formatted with the record-count suffixes
    pub total_records: String,
    pub total_records_raw: u64,
    pub data_types: Vec<DataTypeCount>,
}

impl StatisticsResponse {
    /// Aggregate catalog totals and per-field breach counts, most common field
    /// first.
    pub fn from_catalog(breaches: &[crate::domain::BreachMetadata]) -> Self {
        let total_records_raw = breaches
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.affected_records));

        let mut counts: BTreeMap<IdentityField, usize> = BTreeMap::new();
        for breach in breaches {
            for field in &breach.fields {
                *counts.entry(*field).or_default() += 1;
            }
        }

        let mut data_types: Vec<DataTypeCount> = counts
            .into_iter()
            .map(|(field, breaches)| DataTypeCount { field, breaches })
            .collect();
        data_types.sort_by(|a, b| b.breaches.cmp(&a.breaches).then(a.field.cmp(&b.field)));

        Self {
            total_breaches: breaches.len(),
            total_records: format_record_count(total_records_raw),
            total_records_raw,
            data_types,
        }
    }
}
