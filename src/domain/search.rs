//! Search requests and correlation results

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{BreachMetadata, IdentityField};

/// Exact-mode search: one client-side hash per requested field.
///
/// The engine never sees raw attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub fields: BTreeMap<IdentityField, String>,
}

impl SearchRequest {
    pub fn new(fields: impl IntoIterator<Item = (IdentityField, String)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<IdentityField> {
        self.fields.keys().copied().collect()
    }
}

/// Sensitive-mode search: a single field and a hash prefix.
///
/// `field` stays a raw string so that unknown fields can be answered with an
/// empty result instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveSearchRequest {
    pub field: String,
    pub hash_prefix: String,
}

impl SensitiveSearchRequest {
    pub fn new(field: impl Into<String>, hash_prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            hash_prefix: hash_prefix.into(),
        }
    }
}

/// Per-field outcome of correlating a request against one breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Stored hash equals the supplied hash (or, in sensitive mode, the field
    /// searched by prefix)
    #[serde(rename = "Matched")]
    Matched,
    /// Field exists in the breach but the hash differs
    #[serde(rename = "Not Matched")]
    NotMatched,
    /// Field was requested but the breach does not carry it
    #[serde(rename = "Unable to Match")]
    UnableToMatch,
    /// Sensitive mode: field exists but was not part of the search
    #[serde(rename = "Can't Match")]
    CantMatch,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "Matched",
            MatchStatus::NotMatched => "Not Matched",
            MatchStatus::UnableToMatch => "Unable to Match",
            MatchStatus::CantMatch => "Can't Match",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-mode result for one breach with at least one matched field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub breach: BreachMetadata,
    pub field_status: BTreeMap<IdentityField, MatchStatus>,
    pub matched_fields: BTreeSet<IdentityField>,
    /// True iff fewer fields matched than were requested overall
    pub is_partial: bool,
}

impl MatchResult {
    /// Build a result from per-field statuses. Returns `None` when no field
    /// matched, since such breaches are not reported.
    pub fn from_statuses(
        breach: BreachMetadata,
        field_status: BTreeMap<IdentityField, MatchStatus>,
        requested: usize,
    ) -> Option<Self> {
        let matched_fields: BTreeSet<IdentityField> = field_status
            .iter()
            .filter(|(_, status)| **status == MatchStatus::Matched)
            .map(|(field, _)| *field)
            .collect();

        if matched_fields.is_empty() {
            return None;
        }

        let is_partial = matched_fields.len() < requested;
        Some(Self {
            breach,
            field_status,
            matched_fields,
            is_partial,
        })
    }
}

/// Sensitive-mode result: every stored hash sharing the requested prefix
/// for one breach. None of the candidates is asserted as the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub breach: BreachMetadata,
    pub field: IdentityField,
    pub candidate_hashes: Vec<String>,
    pub field_status: BTreeMap<IdentityField, MatchStatus>,
}

/// Output of a correlation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation<T> {
    pub results: Vec<T>,
    /// Set when a candidate breach was skipped (storage failure or deadline)
    pub truncated: bool,
}

impl<T> Correlation<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            truncated: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> Default for Correlation<T> {
    fn default() -> Self {
        Self::empty()
    }
}
