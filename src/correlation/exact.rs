//! Exact identity correlation

use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    sort_by_date_desc, BreachMetadata, BreachName, Correlation, IdentityField, MatchResult,
    MatchStatus, SearchRequest,
};
use crate::infra::{BreachCatalog, FieldStore, Result};

use super::CorrelationConfig;

/// Outcome of correlating one breach.
struct BreachOutcome {
    result: Option<MatchResult>,
    skipped: bool,
}

/// Finds breaches containing exact hits for the supplied field hashes.
#[derive(Clone)]
pub struct ExactMatchCorrelator {
    catalog: Arc<dyn BreachCatalog>,
    store: Arc<dyn FieldStore>,
    config: CorrelationConfig,
}

impl ExactMatchCorrelator {
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

    /// Correlate every requested field hash against every candidate breach.
    ///
    /// Candidate breaches are those declaring at least one requested field.
    /// Fails only when the catalog cannot be read.
    #[instrument(skip(self, request), fields(requested = request.fields.len()))]
    pub async fn find_matches(&self, request: &SearchRequest) -> Result<Correlation<MatchResult>> {
        if request.is_empty() {
            return Ok(Correlation::empty());
        }

        let requested = request.field_names();
        let candidates: Vec<BreachMetadata> = self
            .catalog
            .list_breaches_declaring_any(&requested)
            .await?
            .into_iter()
            .filter(|breach| breach.declares_any(&requested))
            .collect();
        debug!(candidates = candidates.len(), "Resolved candidate breaches");

        let deadline = Instant::now() + self.config.search_timeout;
        let outcomes: Vec<BreachOutcome> = stream::iter(candidates)
            .map(|breach| self.correlate_breach(breach, request, deadline))
            .buffer_unordered(self.config.max_concurrent_queries.max(1))
            .collect()
            .await;

        let mut truncated = false;
        let mut merged: BTreeMap<BreachName, MatchResult> = BTreeMap::new();
        for outcome in outcomes {
            truncated |= outcome.skipped;
            if let Some(result) = outcome.result {
                merged.entry(result.breach.name.clone()).or_insert(result);
            }
        }

        let mut results: Vec<MatchResult> = merged.into_values().collect();
        sort_by_date_desc(&mut results, |r| &r.breach);

        info!(
            matches = results.len(),
            truncated, "Exact correlation complete"
        );
        Ok(Correlation { results, truncated })
    }

    async fn correlate_breach(
        &self,
        breach: BreachMetadata,
        request: &SearchRequest,
        deadline: Instant,
    ) -> BreachOutcome {
        match timeout_at(deadline, self.field_statuses(&breach, request)).await {
            Ok((statuses, skipped)) => BreachOutcome {
                result: MatchResult::from_statuses(breach, statuses, request.fields.len()),
                skipped,
            },
            Err(_) => {
                warn!(breach = %breach.name, "Search deadline reached, skipping breach");
                BreachOutcome {
                    result: None,
                    skipped: true,
                }
            }
        }
    }

    /// Per-field status for one breach. A field whose lookup fails gets no
    /// status and flags the breach as degraded.
    async fn field_statuses(
        &self,
        breach: &BreachMetadata,
        request: &SearchRequest,
    ) -> (BTreeMap<IdentityField, MatchStatus>, bool) {
        let mut statuses = BTreeMap::new();
        let mut degraded = false;

        for (field, hash) in &request.fields {
            if !breach.declares(*field) {
                statuses.insert(*field, MatchStatus::UnableToMatch);
                continue;
            }

            match self.store.test_exact_hash(&breach.name, *field, hash).await {
                Ok(true) => {
                    statuses.insert(*field, MatchStatus::Matched);
                }
                Ok(false) => {
                    statuses.insert(*field, MatchStatus::NotMatched);
                }
                Err(e) => {
                    warn!(breach = %breach.name, field = %field, error = %e, "Field lookup failed, skipping field");
                    degraded = true;
                }
            }
        }

        (statuses, degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{BreachError, MockBreachCatalog, MockFieldStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use std::time::Duration;

    const H1: &str = "a1b2c3d4e5f6";

    fn linkedin() -> BreachMetadata {
        BreachMetadata::new(
            "linkedin_2021",
            "LinkedIn",
            NaiveDate::from_ymd_opt(2021, 6, 18).unwrap(),
            700_000_000,
            [
                IdentityField::Email,
                IdentityField::FirstName,
                IdentityField::LastName,
                IdentityField::Username,
            ],
        )
    }

    fn facebook() -> BreachMetadata {
        BreachMetadata::new(
            "facebook_2019",
            "Facebook",
            NaiveDate::from_ymd_opt(2019, 9, 4).unwrap(),
            419_000_000,
            [IdentityField::Phone, IdentityField::FirstName],
        )
    }

    fn catalog_with(breaches: Vec<BreachMetadata>) -> MockBreachCatalog {
        let mut catalog = MockBreachCatalog::new();
        catalog
            .expect_list_breaches_declaring_any()
            .returning(move |_| Ok(breaches.clone()));
        catalog
    }

    fn correlator(catalog: MockBreachCatalog, store: MockFieldStore) -> ExactMatchCorrelator {
        ExactMatchCorrelator::new(
            Arc::new(catalog),
            Arc::new(store),
            CorrelationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_match() {
        let mut store = MockFieldStore::new();
        store
            .expect_test_exact_hash()
            .returning(|_, field, hash| Ok(field == IdentityField::Email && hash == H1));

        let correlator = correlator(catalog_with(vec![linkedin()]), store);
        let request = SearchRequest::new([(IdentityField::Email, H1.to_string())]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        assert!(!correlation.truncated);
        assert_eq!(correlation.results.len(), 1);
        let result = &correlation.results[0];
        assert_eq!(result.breach.name.as_str(), "linkedin_2021");
        assert_eq!(result.matched_fields, BTreeSet::from([IdentityField::Email]));
        assert!(!result.is_partial);
    }

    #[tokio::test]
    async fn test_partial_match_with_wrong_hash() {
        let mut store = MockFieldStore::new();
        store
            .expect_test_exact_hash()
            .returning(|_, field, hash| Ok(field == IdentityField::Email && hash == H1));

        let correlator = correlator(catalog_with(vec![linkedin()]), store);
        let request = SearchRequest::new([
            (IdentityField::Email, H1.to_string()),
            (IdentityField::LastName, "wrong".to_string()),
        ]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        let result = &correlation.results[0];
        assert!(result.is_partial);
        assert_eq!(result.field_status[&IdentityField::LastName], MatchStatus::NotMatched);
    }

    #[tokio::test]
    async fn test_undeclared_field_is_unable_to_match_and_partial() {
        let mut store = MockFieldStore::new();
        store
            .expect_test_exact_hash()
            .withf(|_, field, _| *field != IdentityField::Phone)
            .returning(|_, _, _| Ok(true));

        let correlator = correlator(catalog_with(vec![linkedin()]), store);
        let request = SearchRequest::new([
            (IdentityField::Email, H1.to_string()),
            (IdentityField::Phone, "p1".to_string()),
        ]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        let result = &correlation.results[0];
        assert_eq!(
            result.field_status[&IdentityField::Phone],
            MatchStatus::UnableToMatch
        );
        assert!(result.is_partial);
    }

    #[tokio::test]
    async fn test_breach_without_match_is_omitted() {
        let mut store = MockFieldStore::new();
        store
            .expect_test_exact_hash()
            .returning(|breach, _, _| Ok(breach.as_str() == "facebook_2019"));

        let correlator = correlator(catalog_with(vec![linkedin(), facebook()]), store);
        let request = SearchRequest::new([(IdentityField::FirstName, "f1".to_string())]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        let names: Vec<_> = correlation
            .results
            .iter()
            .map(|r| r.breach.name.as_str())
            .collect();
        assert_eq!(names, vec!["facebook_2019"]);
    }

    #[tokio::test]
    async fn test_results_ordered_newest_first_and_deduplicated() {
        let mut store = MockFieldStore::new();
        store.expect_test_exact_hash().returning(|_, _, _| Ok(true));

        let catalog = catalog_with(vec![facebook(), linkedin(), facebook()]);
        let correlator = correlator(catalog, store);
        let request = SearchRequest::new([(IdentityField::FirstName, "f1".to_string())]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        let names: Vec<_> = correlation
            .results
            .iter()
            .map(|r| r.breach.name.as_str())
            .collect();
        assert_eq!(names, vec!["linkedin_2021", "facebook_2019"]);
    }

    #[tokio::test]
    async fn test_empty_request_skips_storage() {
        let mut catalog = MockBreachCatalog::new();
        catalog.expect_list_breaches_declaring_any().never();
        let correlator = correlator(catalog, MockFieldStore::new());

        let correlation = correlator
            .find_matches(&SearchRequest::default())
            .await
            .unwrap();
        assert!(correlation.is_empty());
        assert!(!correlation.truncated);
    }

    #[tokio::test]
    async fn test_storage_error_degrades_instead_of_failing() {
        let mut store = MockFieldStore::new();
        store
            .expect_test_exact_hash()
            .returning(|breach, _, _| match breach.as_str() {
                "linkedin_2021" => Err(BreachError::Internal("connection reset".to_string())),
                _ => Ok(true),
            });

        let correlator = correlator(catalog_with(vec![linkedin(), facebook()]), store);
        let request = SearchRequest::new([(IdentityField::FirstName, "f1".to_string())]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        assert!(correlation.truncated);
        assert_eq!(correlation.results.len(), 1);
        assert_eq!(correlation.results[0].breach.name.as_str(), "facebook_2019");
    }

    #[tokio::test]
    async fn test_catalog_error_is_fatal() {
        let mut catalog = MockBreachCatalog::new();
        catalog
            .expect_list_breaches_declaring_any()
            .returning(|_| Err(BreachError::Internal("catalog offline".to_string())));
        let correlator = correlator(catalog, MockFieldStore::new());

        let request = SearchRequest::new([(IdentityField::Email, H1.to_string())]);
        assert!(correlator.find_matches(&request).await.is_err());
    }

    /// Store that never answers for one breach.
    struct StallingStore;

    #[async_trait]
    impl FieldStore for StallingStore {
        async fn test_exact_hash(
            &self,
            breach: &BreachName,
            _field: IdentityField,
            _hash: &str,
        ) -> Result<bool> {
            if breach.as_str() == "linkedin_2021" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(true)
        }

        async fn query_hash_prefix(
            &self,
            _breach: &BreachName,
            _field: IdentityField,
            _prefix: &str,
            _limit: usize,
        ) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_results() {
        let config = CorrelationConfig {
            search_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let correlator = ExactMatchCorrelator::new(
            Arc::new(catalog_with(vec![linkedin(), facebook()])),
            Arc::new(StallingStore),
            config,
        );

        let request = SearchRequest::new([(IdentityField::FirstName, "f1".to_string())]);
        let correlation = correlator.find_matches(&request).await.unwrap();

        assert!(correlation.truncated);
        assert_eq!(correlation.results.len(), 1);
        assert_eq!(correlation.results[0].breach.name.as_str(), "facebook_2019");
    }
}
