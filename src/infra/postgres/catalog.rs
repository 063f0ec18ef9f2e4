//! PostgreSQL-backed breach catalog
//!
//! Reads the `breach_metadata` table. Field names are stored as a `TEXT[]` of
//! wire keys; keys outside the known vocabulary are skipped with a warning.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPool;
use std::collections::BTreeSet;
use tracing::warn;

use crate::domain::{BreachMetadata, BreachName, IdentityField};
use crate::infra::{BreachCatalog, BreachError, Result};

type MetadataRow = (
    String,
    String,
    NaiveDate,
    i64,
    Vec<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// PostgreSQL breach catalog
pub struct PgBreachCatalog {
    pool: PgPool,
}

impl PgBreachCatalog {
    /// Create a new PostgreSQL breach catalog
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check connectivity
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(BreachError::Database)?;
        Ok(())
    }

    fn row_to_metadata(
        (name, display_name, date, affected_records, fields, description, severity, link): MetadataRow,
    ) -> BreachMetadata {
        let fields = fields
            .iter()
            .filter_map(|key| {
                let field = IdentityField::parse(key);
                if field.is_none() {
                    warn!(breach = %name, field = %key, "Skipping unknown catalog field");
                }
                field
            })
            .collect::<Vec<_>>();

        let mut breach = BreachMetadata::new(
            name,
            display_name,
            date,
            affected_records.max(0) as u64,
            fields,
        );
        breach.description = description;
        breach.severity = severity;
        breach.link = link;
        breach
    }

    fn field_keys(fields: &[IdentityField]) -> Vec<String> {
        fields.iter().map(|f| f.as_str().to_string()).collect()
    }
}

#[async_trait]
impl BreachCatalog for PgBreachCatalog {
    async fn list_breaches_declaring_field(
        &self,
        field: IdentityField,
    ) -> Result<Vec<BreachMetadata>> {
        let rows: Vec<MetadataRow> = sqlx::query_as(
            r#"
            SELECT name, display_name, breach_date, affected_records, fields,
                   description, severity, link
            FROM breach_metadata
            WHERE $1 = ANY(fields)
            ORDER BY breach_date DESC, name ASC
            "#,
        )
        .bind(field.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(BreachError::Database)?;

        Ok(rows.into_iter().map(Self::row_to_metadata).collect())
    }

    async fn list_breaches_declaring_any(
        &self,
        fields: &[IdentityField],
    ) -> Result<Vec<BreachMetadata>> {
        let rows: Vec<MetadataRow> = sqlx::query_as(
            r#"
            SELECT name, display_name, breach_date, affected_records, fields,
                   description, severity, link
            FROM breach_metadata
            WHERE fields && $1
            ORDER BY breach_date DESC, name ASC
            "#,
        )
        .bind(Self::field_keys(fields))
        .fetch_all(&self.pool)
        .await
        .map_err(BreachError::Database)?;

        Ok(rows.into_iter().map(Self::row_to_metadata).collect())
    }

    async fn get_breach_metadata(&self, name: &BreachName) -> Result<BreachMetadata> {
        let row: Option<MetadataRow> = sqlx::query_as(
            r#"
            SELECT name, display_name, breach_date, affected_records, fields,
                   description, severity, link
            FROM breach_metadata
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(BreachError::Database)?;

        row.map(Self::row_to_metadata)
            .ok_or_else(|| BreachError::BreachNotFound(name.to_string()))
    }

    async fn list_breaches(&self) -> Result<Vec<BreachMetadata>> {
        let rows: Vec<MetadataRow> = sqlx::query_as(
            r#"
            SELECT name, display_name, breach_date, affected_records, fields,
                   description, severity, link
            FROM breach_metadata
            ORDER BY breach_date DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(BreachError::Database)?;

        Ok(rows.into_iter().map(Self::row_to_metadata).collect())
    }

    async fn available_fields(&self) -> Result<BTreeSet<IdentityField>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT unnest(fields) AS field_name
            FROM breach_metadata
            ORDER BY field_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(BreachError::Database)?;

        Ok(rows
            .into_iter()
            .filter_map(|(key,)| IdentityField::parse(&key))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_metadata_skips_unknown_fields() {
        let row: MetadataRow = (
            "linkedin_2021".to_string(),
            "LinkedIn".to_string(),
            NaiveDate::from_ymd_opt(2021, 6, 18).unwrap(),
            700_000_000,
            vec![
                "email".to_string(),
                "shoeSize".to_string(),
                "username".to_string(),
            ],
            None,
            None,
            None,
        );
        let breach = PgBreachCatalog::row_to_metadata(row);
        assert_eq!(
            breach.fields,
            BTreeSet::from([IdentityField::Email, IdentityField::Username])
        );
        assert_eq!(breach.affected_records, 700_000_000);
        assert_eq!(breach.link, None);
    }

    #[test]
    fn test_row_to_metadata_keeps_display_metadata() {
        let row: MetadataRow = (
            "facebook_2019".to_string(),
            "Facebook".to_string(),
            NaiveDate::from_ymd_opt(2019, 9, 4).unwrap(),
            419_000_000,
            vec!["phone".to_string()],
            Some("Scraped profile data".to_string()),
            Some("high".to_string()),
            Some("https://example.org/facebook-2019".to_string()),
        );
        let breach = PgBreachCatalog::row_to_metadata(row);
        assert_eq!(breach.description.as_deref(), Some("Scraped profile data"));
        assert_eq!(breach.severity.as_deref(), Some("high"));
        assert_eq!(
            breach.link.as_deref(),
            Some("https://example.org/facebook-2019")
        );
    }

    #[test]
    fn test_negative_record_count_clamped() {
        let row: MetadataRow = (
            "odd".to_string(),
            "Odd".to_string(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            -5,
            vec!["email".to_string()],
            None,
            None,
            None,
        );
        assert_eq!(PgBreachCatalog::row_to_metadata(row).affected_records, 0);
    }
}
