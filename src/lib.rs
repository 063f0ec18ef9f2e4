//! Breach Radar Library
//!
//! Privacy-preserving breach lookup: callers submit one-way hashes of their
//! identity attributes (or, for sensitive attributes, only a hash prefix) and
//! learn which breach datasets contain them.
//!
//! ## Modules
//!
//! - [`domain`] - Breach metadata, identity fields, search requests and results
//! - [`correlation`] - Exact and prefix correlation engines
//! - [`infra`] - Storage ports and their PostgreSQL / in-memory adapters
//! - [`metrics`] - Observability and metrics
//! - [`api`] - REST API routes
//! - [`server`] - Configuration and HTTP bootstrap

pub mod api;
pub mod correlation;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod migrations;
pub mod server;

// Re-export commonly used types
pub use correlation::{CorrelationConfig, ExactMatchCorrelator, SensitiveCandidateCorrelator};
pub use domain::{
    BreachMetadata, BreachName, CandidateResult, Correlation, IdentityField, MatchResult,
    MatchStatus, SearchRequest, SensitiveSearchRequest,
};
pub use infra::{BreachCatalog, BreachError, FieldStore, InMemoryBreachStore, Result};
