//! Display formatting for correlation results
//!
//! Turns raw correlation output into the summaries returned to clients:
//! SI-style record counts, ISO dates and per-field status maps.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{BreachMetadata, CandidateResult, IdentityField, MatchResult, MatchStatus};

/// Format a record count with one decimal and an SI-like suffix.
///
/// `700_000_000` → `"700.0M"`, `1_500` → `"1.5K"`, `999` → `"999"`.
pub fn format_record_count(records: u64) -> String {
    let value = records as f64;
    if records >= 1_000_000_000 {
        format!("{:.1}B", value / 1e9)
    } else if records >= 1_000_000 {
        format!("{:.1}M", value / 1e6)
    } else if records >= 1_000 {
        format!("{:.1}K", value / 1e3)
    } else {
        records.to_string()
    }
}

/// Format a breach date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Display summary of a breach, shared by every response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachSummary {
    pub name: String,
    pub display_name: String,
    pub date: String,
    pub affected_records: String,
    pub fields: Vec<IdentityField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl From<&BreachMetadata> for BreachSummary {
    fn from(breach: &BreachMetadata) -> Self {
        Self {
            name: breach.name.to_string(),
            display_name: breach.display_name.clone(),
            date: format_date(breach.date),
            affected_records: format_record_count(breach.affected_records),
            fields: breach.fields.iter().copied().collect(),
            description: breach.description.clone(),
            severity: breach.severity.clone(),
            link: breach.link.clone(),
        }
    }
}

/// Exact-mode summary: `{name, date, affectedRecords, matchedFields, partialMatch}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub name: String,
    pub display_name: String,
    pub date: String,
    pub affected_records: String,
    pub matched_fields: Vec<IdentityField>,
    pub fields: BTreeMap<IdentityField, MatchStatus>,
    pub partial_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Sensitive-mode summary: `{name, date, affectedRecords, hashCandidates, partialMatch}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub name: String,
    pub display_name: String,
    pub date: String,
    pub affected_records: String,
    pub hash_candidates: BTreeMap<IdentityField, Vec<String>>,
    pub fields: BTreeMap<IdentityField, MatchStatus>,
    /// Always true: the server never confirms a prefix candidate
    pub partial_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

pub fn summarize_match(result: &MatchResult) -> MatchSummary {
    MatchSummary {
        name: result.breach.name.to_string(),
        display_name: result.breach.display_name.clone(),
        date: format_date(result.breach.date),
        affected_records: format_record_count(result.breach.affected_records),
        matched_fields: result.matched_fields.iter().copied().collect(),
        fields: result.field_status.clone(),
        partial_match: result.is_partial,
        description: result.breach.description.clone(),
        severity: result.breach.severity.clone(),
        link: result.breach.link.clone(),
    }
}

pub fn summarize_candidate(result: &CandidateResult) -> CandidateSummary {
    CandidateSummary {
        name: result.breach.name.to_string(),
        display_name: result.breach.display_name.clone(),
        date: format_date(result.breach.date),
        affected_records: format_record_count(result.breach.affected_records),
        hash_candidates: BTreeMap::from([(result.field, result.candidate_hashes.clone())]),
        fields: result.field_status.clone(),
        partial_match: true,
        description: result.breach.description.clone(),
        severity: result.breach.severity.clone(),
        link: result.breach.link.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_format_record_count() {
        assert_eq!(format_record_count(0), "0");
        assert_eq!(format_record_count(999), "999");
        assert_eq!(format_record_count(1_000), "1.0K");
        assert_eq!(format_record_count(1_560), "1.6K");
        assert_eq!(format_record_count(419_000_000), "419.0M");
        assert_eq!(format_record_count(700_000_000), "700.0M");
        assert_eq!(format_record_count(1_000_000_000), "1.0B");
        assert_eq!(format_record_count(15_200_000_000), "15.2B");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2019, 9, 4).unwrap();
        assert_eq!(format_date(date), "2019-09-04");
    }

    #[test]
    fn test_summarize_match() {
        let breach = BreachMetadata::new(
            "linkedin_2021",
            "LinkedIn",
            NaiveDate::from_ymd_opt(2021, 6, 18).unwrap(),
            700_000_000,
            [IdentityField::Email, IdentityField::LastName],
        );
        let result = MatchResult {
            breach,
            field_status: BTreeMap::from([
                (IdentityField::Email, MatchStatus::Matched),
                (IdentityField::LastName, MatchStatus::NotMatched),
            ]),
            matched_fields: BTreeSet::from([IdentityField::Email]),
            is_partial: true,
        };

        let json = serde_json::to_value(summarize_match(&result)).unwrap();
        assert_eq!(json["name"], "linkedin_2021");
        assert_eq!(json["date"], "2021-06-18");
        assert_eq!(json["affectedRecords"], "700.0M");
        assert_eq!(json["matchedFields"], serde_json::json!(["email"]));
        assert_eq!(json["fields"]["lastName"], "Not Matched");
        assert_eq!(json["partialMatch"], true);
        assert!(json.get("link").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_summaries_carry_display_metadata() {
        let breach = BreachMetadata::new(
            "passwords_2020",
            "Password Dump",
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
            500_000_000,
            [IdentityField::Password],
        )
        .with_description("Credential stuffing list")
        .with_severity("critical")
        .with_link("https://example.org/passwords-2020");

        let summary = serde_json::to_value(BreachSummary::from(&breach)).unwrap();
        assert_eq!(summary["description"], "Credential stuffing list");
        assert_eq!(summary["severity"], "critical");
        assert_eq!(summary["link"], "https://example.org/passwords-2020");

        let result = CandidateResult {
            breach,
            field: IdentityField::Password,
            candidate_hashes: vec!["a1b2c3d4e5".to_string()],
            field_status: BTreeMap::from([(IdentityField::Password, MatchStatus::Matched)]),
        };
        let candidate = serde_json::to_value(summarize_candidate(&result)).unwrap();
        assert_eq!(candidate["link"], "https://example.org/passwords-2020");
        assert_eq!(candidate["severity"], "critical");
    }

    #[test]
    fn test_summarize_candidate() {
        let breach = BreachMetadata::new(
            "passwords_2020",
            "Password Dump",
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
            500_000_000,
            [IdentityField::Password],
        );
        let result = CandidateResult {
            breach,
            field: IdentityField::Password,
            candidate_hashes: vec!["a1b2c3d4e5".to_string(), "a1b2c3d4f6".to_string()],
            field_status: BTreeMap::from([(IdentityField::Password, MatchStatus::Matched)]),
        };

        let json = serde_json::to_value(summarize_candidate(&result)).unwrap();
        assert_eq!(
            json["hashCandidates"]["password"],
            serde_json::json!(["a1b2c3d4e5", "a1b2c3d4f6"])
        );
        assert_eq!(json["partialMatch"], true);
        assert_eq!(json["affectedRecords"], "500.0M");
    }
}
