//! k-anonymity prefix correlation for sensitive fields

use futures::{stream, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    sort_by_date_desc, BreachMetadata, BreachName, CandidateResult, Correlation, IdentityField,
    MatchStatus, SensitiveSearchRequest,
};
use crate::infra::{BreachCatalog, FieldStore, Result};

use super::CorrelationConfig;

/// Candidate hashes grouped by breach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub breaches: BTreeMap<BreachName, BreachMetadata>,
    pub hashes: BTreeMap<BreachName, Vec<String>>,
    /// Set when a breach was skipped
    pub truncated: bool,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Returns every stored hash sharing a prefix so the caller can confirm the
/// real match locally.
#[derive(Clone)]
pub struct SensitiveCandidateCorrelator {
    catalog: Arc<dyn BreachCatalog>,
    store: Arc<dyn FieldStore>,
    config: CorrelationConfig,
}

impl SensitiveCandidateCorrelator {
    pub fn new(
        catalog: Arc<dyn BreachCatalog>,
        store: Arc<dyn FieldStore>,
        config: CorrelationConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    /// Resolve the request field and run a prefix lookup.
    ///
    /// Empty or unknown field names yield an empty correlation. The prefix is
    /// validated only once the field is known.
    #[instrument(skip(self, request), fields(field = %request.field, prefix_len = request.hash_prefix.len()))]
    pub async fn search(
        &self,
        request: &SensitiveSearchRequest,
    ) -> Result<Correlation<CandidateResult>> {
        let name = request.field.trim();
        if name.is_empty() {
            return Ok(Correlation::empty());
        }
        let Some(field) = IdentityField::parse(name) else {
            debug!(field = name, "Unsupported field in sensitive search");
            return Ok(Correlation::empty());
        };

        let set = self.find_candidates(field, &request.hash_prefix).await?;
        let truncated = set.truncated;
        let results = build_candidate_breaches(field, set);

        info!(
            breaches = results.len(),
            truncated, "Sensitive correlation complete"
        );
        Ok(Correlation { results, truncated })
    }

    /// Collect stored hashes of `field` starting with `prefix` from every
    /// breach declaring the field. Stored digests are lowercase hex, so the
    /// prefix is lowercased before lookup.
    pub async fn find_candidates(&self, field: IdentityField, prefix: &str) -> Result<CandidateSet> {
        self.config.check_prefix(prefix)?;
        let prefix = prefix.to_ascii_lowercase();
        let prefix = prefix.as_str();

        let breaches: Vec<BreachMetadata> = self
            .catalog
            .list_breaches_declaring_field(field)
            .await?
            .into_iter()
            .filter(|breach| breach.declares(field))
            .collect();
        debug!(candidates = breaches.len(), "Resolved breaches declaring field");

        let deadline = Instant::now() + self.config.search_timeout;
        let limit = self.config.candidate_limit;
        let lookups: Vec<(BreachMetadata, Option<Vec<String>>)> = stream::iter(breaches)
            .map(|breach| async move {
                let lookup = timeout_at(
                    deadline,
                    self.store
                        .query_hash_prefix(&breach.name, field, prefix, limit),
                )
                .await;
                let hashes = match lookup {
                    Ok(Ok(hashes)) => Some(hashes),
                    Ok(Err(e)) => {
                        warn!(breach = %breach.name, error = %e, "Prefix lookup failed, skipping breach");
                        None
                    }
                    Err(_) => {
                        warn!(breach = %breach.name, "Search deadline reached, skipping breach");
                        None
                    }
                };
                (breach, hashes)
            })
            .buffer_unordered(self.config.max_concurrent_queries.max(1))
            .collect()
            .await;

        let mut set = CandidateSet::default();
        for (breach, hashes) in lookups {
            let Some(hashes) = hashes else {
                set.truncated = true;
                continue;
            };
            let hashes = filter_candidates(hashes, prefix, limit);
            if hashes.is_empty() || set.hashes.contains_key(&breach.name) {
                continue;
            }
            set.hashes.insert(breach.name.clone(), hashes);
            set.breaches.insert(breach.name.clone(), breach);
        }

        Ok(set)
    }
}

/// Keep hashes that really share the prefix, without duplicates, up to `limit`.
fn filter_candidates(hashes: Vec<String>, prefix: &str, limit: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    hashes
        .into_iter()
        .filter(|hash| hash.starts_with(prefix))
        .filter(|hash| seen.insert(hash.clone()))
        .take(limit)
        .collect()
}

/// Turn grouped candidates into per-breach results, newest breach first.
///
/// The searched field is reported `Matched` and every other declared field
/// `Can't Match`.
pub fn build_candidate_breaches(field: IdentityField, set: CandidateSet) -> Vec<CandidateResult> {
    let CandidateSet {
        mut breaches,
        hashes,
        ..
    } = set;

    let mut results: Vec<CandidateResult> = hashes
        .into_iter()
        .filter_map(|(name, candidate_hashes)| {
            let breach = breaches.remove(&name)?;
            let field_status = breach
                .fields
                .iter()
                .map(|declared| {
                    let status = if *declared == field {
                        MatchStatus::Matched
                    } else {
                        MatchStatus::CantMatch
                    };
                    (*declared, status)
                })
                .collect();
            Some(CandidateResult {
                breach,
                field,
                candidate_hashes,
                field_status,
            })
        })
        .collect();

    sort_by_date_desc(&mut results, |r| &r.breach);
    results
}
