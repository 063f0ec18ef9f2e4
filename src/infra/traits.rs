//! Storage ports consumed by the correlation engine
//!
//! The engine only ever reads through these traits. Translating a field into
//! a physical table/column is the adapter's job, never the engine's.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeSet;

use crate::domain::{BreachMetadata, BreachName, IdentityField};

use super::{BreachError, Result};

/// Registry of breach datasets and the identity fields each one carries.
///
/// Read-only from the engine's point of view.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BreachCatalog: Send + Sync {
    /// Every breach declaring `field`
    async fn list_breaches_declaring_field(
        &self,
        field: IdentityField,
    ) -> Result<Vec<BreachMetadata>>;

    /// Every breach declaring at least one of `fields`
    async fn list_breaches_declaring_any(
        &self,
        fields: &[IdentityField],
    ) -> Result<Vec<BreachMetadata>>;

    /// Metadata for a single breach, `BreachNotFound` if absent
    async fn get_breach_metadata(&self, name: &BreachName) -> Result<BreachMetadata>;

    /// Capability query: does `name` carry `field`?
    ///
    /// Unknown breaches declare nothing.
    async fn breach_declares_field(&self, name: &BreachName, field: IdentityField) -> Result<bool> {
        match self.get_breach_metadata(name).await {
            Ok(breach) => Ok(breach.declares(field)),
            Err(BreachError::BreachNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Full catalog, newest breach first
    async fn list_breaches(&self) -> Result<Vec<BreachMetadata>>;

    /// Union of the fields declared across the catalog
    async fn available_fields(&self) -> Result<BTreeSet<IdentityField>>;
}

/// Per-breach hashed field data.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FieldStore: Send + Sync {
    /// Exact-equality test of `hash` against the stored `field` hashes of `breach`
    async fn test_exact_hash(
        &self,
        breach: &BreachName,
        field: IdentityField,
        hash: &str,
    ) -> Result<bool>;

    /// Stored `field` hashes of `breach` starting with `prefix`, at most `limit`
    async fn query_hash_prefix(
        &self,
        breach: &BreachName,
        field: IdentityField,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>>;
}
