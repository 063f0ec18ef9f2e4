//! Breach correlation engine
//!
//! Two correlators sit on top of the storage ports:
//!
//! - [`ExactMatchCorrelator`] tests every supplied field hash against every
//!   breach that could contain it and classifies full vs. partial matches.
//! - [`SensitiveCandidateCorrelator`] answers a k-anonymity prefix lookup with
//!   every stored hash sharing the prefix, grouped by breach, without ever
//!   asserting which candidate is the caller's.
//!
//! Per-breach work fans out concurrently and is bounded by a request
//! deadline. A breach whose storage call fails or misses the deadline is
//! skipped and the correlation is flagged `truncated`; only catalog failures
//! abort a request.

mod exact;
mod sensitive;

pub use exact::ExactMatchCorrelator;
pub use sensitive::{build_candidate_breaches, CandidateSet, SensitiveCandidateCorrelator};

use std::time::Duration;

use crate::infra::{BreachError, Result};

/// Default cap on candidates returned per breach for a prefix lookup.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 1000;

/// Default wall-clock budget for one search request.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning for both correlators.
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Deadline for all per-breach work of one request
    pub search_timeout: Duration,
    /// Maximum candidates returned per breach in sensitive mode
    pub candidate_limit: usize,
    /// Shortest accepted hash prefix
    pub min_prefix_len: usize,
    /// Longest accepted hash prefix; longer prefixes would turn the lookup into an exact oracle
    pub max_prefix_len: usize,
    /// Breaches queried concurrently within one request
    pub max_concurrent_queries: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            min_prefix_len: 5,
            max_prefix_len: 32,
            max_concurrent_queries: 8,
        }
    }
}

impl CorrelationConfig {
    /// Reject inconsistent bounds.
    pub fn validate(&self) -> Result<()> {
        if self.search_timeout.is_zero() {
            return Err(BreachError::Configuration(
                "search_timeout must be greater than zero".to_string(),
            ));
        }
        if self.min_prefix_len == 0 {
            return Err(BreachError::Configuration(
                "min_prefix_len must be at least 1".to_string(),
            ));
        }
        if self.min_prefix_len > self.max_prefix_len {
            return Err(BreachError::Configuration(format!(
                "min_prefix_len ({}) exceeds max_prefix_len ({})",
                self.min_prefix_len, self.max_prefix_len
            )));
        }
        if self.candidate_limit == 0 || self.max_concurrent_queries == 0 {
            return Err(BreachError::Configuration(
                "candidate_limit and max_concurrent_queries must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Enforce the prefix policy: ASCII alphanumeric, length within bounds.
    pub fn check_prefix(&self, prefix: &str) -> Result<()> {
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BreachError::InvalidPrefix(
                "hash prefix must be ASCII alphanumeric".to_string(),
            ));
        }
        let len = prefix.len();
        if len < self.min_prefix_len || len > self.max_prefix_len {
            return Err(BreachError::InvalidPrefix(format!(
                "hash prefix length {} outside accepted range {}..={}",
                len, self.min_prefix_len, self.max_prefix_len
            )));
        }
        Ok(())
    }
}
