//! Breach dataset metadata

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::IdentityField;
use crate::infra::BreachError;

/// Stable internal identifier of a breach dataset (unique across the catalog).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreachName(pub String);

impl BreachName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BreachName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BreachName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BreachName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One breach dataset as registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachMetadata {
    pub name: BreachName,
    pub display_name: String,
    /// Date the breach was disclosed
    pub date: NaiveDate,
    /// Only used for display formatting
    pub affected_records: u64,
    /// Identity fields present in this dataset
    pub fields: BTreeSet<IdentityField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form rating such as `high` or `critical`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Where the breach was reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl BreachMetadata {
    pub fn new(
        name: impl Into<BreachName>,
        display_name: impl Into<String>,
        date: NaiveDate,
        affected_records: u64,
        fields: impl IntoIterator<Item = IdentityField>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            date,
            affected_records,
            fields: fields.into_iter().collect(),
            description: None,
            severity: None,
            link: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Whether this dataset carries the given field.
    pub fn declares(&self, field: IdentityField) -> bool {
        self.fields.contains(&field)
    }

    /// Whether this dataset carries at least one of the given fields.
    pub fn declares_any<'a>(&self, fields: impl IntoIterator<Item = &'a IdentityField>) -> bool {
        fields.into_iter().any(|f| self.declares(*f))
    }

    /// Check the per-record invariants: a non-empty field set and a
    /// disclosure date that is not in the future.
    pub fn validate(&self, today: NaiveDate) -> Result<(), BreachError> {
        if self.fields.is_empty() {
            return Err(BreachError::InvalidMetadata {
                breach: self.name.to_string(),
                reason: "breach declares no identity fields".to_string(),
            });
        }
        if self.date > today {
            return Err(BreachError::InvalidMetadata {
                breach: self.name.to_string(),
                reason: format!("disclosure date {} is in the future", self.date),
            });
        }
        Ok(())
    }
}

/// Presentation order: newest breach first, name as tie-break.
pub fn sort_by_date_desc<T>(items: &mut [T], breach: impl Fn(&T) -> &BreachMetadata) {
    items.sort_by(|a, b| {
        let (a, b) = (breach(a), breach(b));
        b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name))
    });
}
