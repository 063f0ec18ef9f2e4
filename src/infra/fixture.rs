//! JSON breach fixtures
//!
//! One file describes a set of breaches and their stored hashes:
//! `{"breaches": [{...metadata, "records": {field: [hash]}}]}`. Used to seed
//! the in-memory store and to bulk-load PostgreSQL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::domain::{BreachMetadata, IdentityField};

use super::{BreachError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreachFixture {
    pub breaches: Vec<FixtureBreach>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureBreach {
    #[serde(flatten)]
    pub metadata: BreachMetadata,
    #[serde(default)]
    pub records: BTreeMap<IdentityField, Vec<String>>,
}

impl BreachFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check metadata invariants, unique names, and that records only use
    /// declared fields.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &self.breaches {
            let breach = &entry.metadata;
            breach.validate(today)?;
            if !seen.insert(&breach.name) {
                return Err(BreachError::InvalidMetadata {
                    breach: breach.name.to_string(),
                    reason: "duplicate breach name".to_string(),
                });
            }
            if let Some(field) = entry.records.keys().find(|f| !breach.declares(**f)) {
                return Err(BreachError::InvalidMetadata {
                    breach: breach.name.to_string(),
                    reason: format!("field {field} is not declared"),
                });
            }
        }
        Ok(())
    }

    /// Total stored hashes across all breaches and fields.
    pub fn record_count(&self) -> usize {
        self.breaches
            .iter()
            .flat_map(|b| b.records.values())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "breaches": [{
            "name": "linkedin_2021",
            "displayName": "LinkedIn",
            "date": "2021-06-18",
            "affectedRecords": 700000000,
            "fields": ["email", "firstName"],
            "records": {"email": ["e1", "e2"], "firstName": ["f1"]}
        }]
    }"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_parse_and_count() {
        let fixture = BreachFixture::from_json(FIXTURE).unwrap();
        assert_eq!(fixture.breaches.len(), 1);
        assert_eq!(fixture.record_count(), 3);
        assert!(fixture.validate(today()).is_ok());
        assert_eq!(fixture.breaches[0].metadata.link, None);
    }

    #[test]
    fn test_display_metadata_parsed() {
        let fixture = BreachFixture::from_json(
            r#"{
                "breaches": [{
                    "name": "forum_2018",
                    "displayName": "Forum",
                    "date": "2018-01-01",
                    "affectedRecords": 10,
                    "fields": ["email"],
                    "description": "Forum database dump",
                    "severity": "medium",
                    "link": "https://example.org/forum-2018",
                    "records": {"email": ["e1"]}
                }]
            }"#,
        )
        .unwrap();
        let breach = &fixture.breaches[0].metadata;
        assert_eq!(breach.description.as_deref(), Some("Forum database dump"));
        assert_eq!(breach.severity.as_deref(), Some("medium"));
        assert_eq!(breach.link.as_deref(), Some("https://example.org/forum-2018"));
    }

    #[test]
    fn test_undeclared_record_field_rejected() {
        let mut fixture = BreachFixture::from_json(FIXTURE).unwrap();
        fixture.breaches[0]
            .records
            .insert(IdentityField::Phone, vec!["p1".to_string()]);
        assert!(matches!(
            fixture.validate(today()),
            Err(BreachError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn test_duplicate_breach_rejected() {
        let mut fixture = BreachFixture::from_json(FIXTURE).unwrap();
        fixture.breaches.push(fixture.breaches[0].clone());
        assert!(fixture.validate(today()).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            BreachFixture::from_json("{\"breaches\": 3}"),
            Err(BreachError::FixtureFormat(_))
        ));
    }
}
