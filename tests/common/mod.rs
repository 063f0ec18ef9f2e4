//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use breach_radar::domain::{BreachName, IdentityField};
use breach_radar::infra::{BreachError, FieldStore, InMemoryBreachStore, Result};
use breach_radar::server::AppState;
use breach_radar::CorrelationConfig;

/// The fixture shipped with the service.
pub const FIXTURE_JSON: &str = include_str!("../../fixtures/breaches.json");

/// Stored hashes from the shipped fixture, by the breach that holds them.
pub const LINKEDIN_EMAIL: &str = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234567890123456789012345678901234567890123456789012345678901234567890";
pub const SHARED_FIRST_NAME: &str = "f1e2d3c4b5a6789012345678901234567890123456789012345678901234567890123456789012345678901234567890123456789012345678901234567890";
pub const LINKEDIN_LAST_NAME: &str = "b2c3d4e5f6a7789012345678901234567890123456789012345678901234567890123456789012345678901234567890123456789012345678901234567890";
pub const LINKEDIN_USERNAME: &str = "u1v2w3x4y5z6789012345678901234567890123456789012345678901234567890123456789012345678901234567890123456789012345678901234567890";
pub const FACEBOOK_PHONE: &str = "c3d4e5f6a7b8789012345678901234567890123456789012345678901234567890123456789012345678901234567890123456789012345678901234567890";

/// Prefix shared by three of the four stored password hashes.
pub const PASSWORD_PREFIX: &str = "a1b2c3d4";

/// A hash that is stored nowhere.
pub fn unknown_hash() -> String {
    "0".repeat(128)
}

/// In-memory store holding the shipped fixture.
pub fn fixture_store() -> InMemoryBreachStore {
    InMemoryBreachStore::from_json(FIXTURE_JSON).expect("fixture parses")
}

/// Correlation settings with a short deadline so stalled lookups finish fast.
pub fn test_config() -> CorrelationConfig {
    CorrelationConfig {
        search_timeout: Duration::from_millis(200),
        ..CorrelationConfig::default()
    }
}

/// Application state over the shipped fixture.
pub fn fixture_state() -> AppState {
    AppState::in_memory(fixture_store(), CorrelationConfig::default())
}

/// Application state whose field store fails for one breach.
pub fn state_with_failing_breach(breach: &str) -> AppState {
    let store = Arc::new(fixture_store());
    let failing = Arc::new(FailingFieldStore::new(store.clone(), breach));
    AppState::new(store, failing, test_config())
}

/// Field store that errors for one breach and delegates the rest.
pub struct FailingFieldStore {
    inner: Arc<InMemoryBreachStore>,
    failing: BreachName,
}

impl FailingFieldStore {
    pub fn new(inner: Arc<InMemoryBreachStore>, failing: &str) -> Self {
        Self {
            inner,
            failing: BreachName::from(failing),
        }
    }
}

#[async_trait]
impl FieldStore for FailingFieldStore {
    async fn test_exact_hash(
        &self,
        breach: &BreachName,
        field: IdentityField,
        hash: &str,
    ) -> Result<bool> {
        if *breach == self.failing {
            return Err(BreachError::Internal(format!("{breach} unavailable")));
        }
        self.inner.test_exact_hash(breach, field, hash).await
    }

    async fn query_hash_prefix(
        &self,
        breach: &BreachName,
        field: IdentityField,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        if *breach == self.failing {
            return Err(BreachError::Internal(format!("{breach} unavailable")));
        }
        self.inner
            .query_hash_prefix(breach, field, prefix, limit)
            .await
    }
}

/// Field store that never answers for one breach.
pub struct StallingFieldStore {
    inner: Arc<InMemoryBreachStore>,
    stalled: BreachName,
}

impl StallingFieldStore {
    pub fn new(inner: Arc<InMemoryBreachStore>, stalled: &str) -> Self {
        Self {
            inner,
            stalled: BreachName::from(stalled),
        }
    }
}

#[async_trait]
impl FieldStore for StallingFieldStore {
    async fn test_exact_hash(
        &self,
        breach: &BreachName,
        field: IdentityField,
        hash: &str,
    ) -> Result<bool> {
        if *breach == self.stalled {
            std::future::pending::<()>().await;
        }
        self.inner.test_exact_hash(breach, field, hash).await
    }

    async fn query_hash_prefix(
        &self,
        breach: &BreachName,
        field: IdentityField,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        if *breach == self.stalled {
            std::future::pending::<()>().await;
        }
        self.inner
            .query_hash_prefix(breach, field, prefix, limit)
            .await
    }
}
