//! In-memory breach catalog and field store
//!
//! Backs local runs (loaded from a JSON fixture file) and tests. The store is
//! immutable once built, so it is shared without locking.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use tracing::info;

use crate::domain::{sort_by_date_desc, BreachMetadata, BreachName, IdentityField};

use super::{BreachCatalog, BreachError, BreachFixture, FieldStore, Result};

/// Catalog plus hashed field data held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBreachStore {
    breaches: BTreeMap<BreachName, BreachMetadata>,
    /// Sorted hash sets per (breach, field); sorted order makes prefix scans a range walk
    hashes: BTreeMap<BreachName, BTreeMap<IdentityField, BTreeSet<String>>>,
}

impl InMemoryBreachStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a breach. Fails on a duplicate name or an invariant violation.
    pub fn with_breach(mut self, breach: BreachMetadata) -> Result<Self> {
        breach.validate(Utc::now().date_naive())?;
        if self.breaches.contains_key(&breach.name) {
            return Err(BreachError::InvalidMetadata {
                breach: breach.name.to_string(),
                reason: "duplicate breach name".to_string(),
            });
        }
        self.breaches.insert(breach.name.clone(), breach);
        Ok(self)
    }

    /// Add stored hashes for a field of an already registered breach.
    pub fn with_hashes<I, S>(mut self, breach: &str, field: IdentityField, hashes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = BreachName::from(breach);
        let metadata = self
            .breaches
            .get(&name)
            .ok_or_else(|| BreachError::BreachNotFound(breach.to_string()))?;
        if !metadata.declares(field) {
            return Err(BreachError::InvalidMetadata {
                breach: breach.to_string(),
                reason: format!("field {field} is not declared"),
            });
        }

        self.hashes
            .entry(name)
            .or_default()
            .entry(field)
            .or_default()
            .extend(hashes.into_iter().map(Into::into));
        Ok(self)
    }

    /// Parse a JSON fixture: `{"breaches": [{...metadata, "records": {field: [hash]}}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_fixture(BreachFixture::from_json(json)?)
    }

    /// Build a store from a parsed fixture.
    pub fn from_fixture(fixture: BreachFixture) -> Result<Self> {
        let mut store = Self::new();
        for entry in fixture.breaches {
            let name = entry.metadata.name.to_string();
            store = store.with_breach(entry.metadata)?;
            for (field, hashes) in entry.records {
                store = store.with_hashes(&name, field, hashes)?;
            }
        }
        Ok(store)
    }

    /// Load a JSON fixture from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let store = Self::from_json(&json)?;
        info!(
            "Loaded {} breaches from fixture {}",
            store.breach_count(),
            path.display()
        );
        Ok(store)
    }

    pub fn breach_count(&self) -> usize {
        self.breaches.len()
    }

    fn stored(&self, breach: &BreachName, field: IdentityField) -> Option<&BTreeSet<String>> {
        self.hashes.get(breach).and_then(|fields| fields.get(&field))
    }

    fn sorted(mut breaches: Vec<BreachMetadata>) -> Vec<BreachMetadata> {
        sort_by_date_desc(&mut breaches, |b| b);
        breaches
    }
}

#[async_trait]
impl BreachCatalog for InMemoryBreachStore {
    async fn list_breaches_declaring_field(
        &self,
        field: IdentityField,
    ) -> Result<Vec<BreachMetadata>> {
        Ok(Self::sorted(
            self.breaches
                .values()
                .filter(|b| b.declares(field))
                .cloned()
                .collect(),
        ))
    }

    async fn list_breaches_declaring_any(
        &self,
        fields: &[IdentityField],
    ) -> Result<Vec<BreachMetadata>> {
        Ok(Self::sorted(
            self.breaches
                .values()
                .filter(|b| b.declares_any(fields))
                .cloned()
                .collect(),
        ))
    }

    async fn get_breach_metadata(&self, name: &BreachName) -> Result<BreachMetadata> {
        self.breaches
            .get(name)
            .cloned()
            .ok_or_else(|| BreachError::BreachNotFound(name.to_string()))
    }

    async fn list_breaches(&self) -> Result<Vec<BreachMetadata>> {
        Ok(Self::sorted(self.breaches.values().cloned().collect()))
    }

    async fn available_fields(&self) -> Result<BTreeSet<IdentityField>> {
        Ok(self
            .breaches
            .values()
            .flat_map(|b| b.fields.iter().copied())
            .collect())
    }
}

#[async_trait]
impl FieldStore for InMemoryBreachStore {
    async fn test_exact_hash(
        &self,
        breach: &BreachName,
        field: IdentityField,
        hash: &str,
    ) -> Result<bool> {
        Ok(self
            .stored(breach, field)
            .map(|hashes| hashes.contains(hash))
            .unwrap_or(false))
    }

    async fn query_hash_prefix(
        &self,
        breach: &BreachName,
        field: IdentityField,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let Some(hashes) = self.stored(breach, field) else {
            return Ok(Vec::new());
        };

        Ok(hashes
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|h| h.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect())
    }
}
