//! Bulk loader from JSON fixtures into PostgreSQL
//!
//! Loading a breach replaces whatever was stored for it before: the
//! per-breach table is recreated and its rows in the shared sensitive tables
//! are deleted, all inside one transaction.

use chrono::Utc;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::infra::column_map::quote_identifier;
use crate::infra::{
    BreachError, BreachFixture, FieldColumnMap, FieldLocation, FixtureBreach, Result,
};

const RESERVED_TABLES: [&str; 2] = ["breach_metadata", "_sqlx_migrations"];

/// What a load wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub breaches: usize,
    pub records: usize,
}

/// Writes fixtures into the catalog and field tables.
pub struct PgBreachLoader {
    pool: PgPool,
    columns: Arc<FieldColumnMap>,
}

impl PgBreachLoader {
    pub fn new(pool: PgPool, columns: Arc<FieldColumnMap>) -> Self {
        Self { pool, columns }
    }

    /// Validate and load every breach of `fixture` in a single transaction.
    #[instrument(skip(self, fixture), fields(breaches = fixture.breaches.len()))]
    pub async fn load(&self, fixture: &BreachFixture) -> Result<LoadSummary> {
        fixture.validate(Utc::now().date_naive())?;

        let mut tx = self.pool.begin().await?;
        let mut summary = LoadSummary::default();
        for entry in &fixture.breaches {
            summary.records += self.load_breach(&mut tx, entry).await?;
            summary.breaches += 1;
        }
        tx.commit().await?;

        info!(
            breaches = summary.breaches,
            records = summary.records,
            "Fixture loaded"
        );
        Ok(summary)
    }

    async fn load_breach(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &FixtureBreach,
    ) -> Result<usize> {
        let breach = &entry.metadata;
        let name = breach.name.as_str();
        if self.is_reserved_table(name) {
            return Err(BreachError::InvalidMetadata {
                breach: name.to_string(),
                reason: "breach name collides with a catalog table".to_string(),
            });
        }
        let table = quote_identifier(name)?;
        let affected_records = i64::try_from(breach.affected_records).map_err(|_| {
            BreachError::InvalidMetadata {
                breach: name.to_string(),
                reason: "affected record count out of range".to_string(),
            }
        })?;
        let fields: Vec<String> = breach.fields.iter().map(|f| f.as_str().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO breach_metadata
                (name, display_name, breach_date, affected_records, fields,
                 description, severity, link)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                breach_date = EXCLUDED.breach_date,
                affected_records = EXCLUDED.affected_records,
                fields = EXCLUDED.fields,
                description = EXCLUDED.description,
                severity = EXCLUDED.severity,
                link = EXCLUDED.link
            "#,
        )
        .bind(name)
        .bind(&breach.display_name)
        .bind(breach.date)
        .bind(affected_records)
        .bind(&fields)
        .bind(&breach.description)
        .bind(&breach.severity)
        .bind(&breach.link)
        .execute(&mut **tx)
        .await?;

        for (shared_table, _) in self.columns.shared_tables() {
            let shared_table = quote_identifier(shared_table)?;
            sqlx::query(&format!(
                "DELETE FROM {shared_table} WHERE breach_source = $1"
            ))
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut **tx)
            .await?;
        let personal = self.personal_columns(entry)?;
        if !personal.is_empty() {
            let columns = personal
                .iter()
                .map(|c| format!("{c} TEXT"))
                .collect::<Vec<_>>()
                .join(", ");
            sqlx::query(&format!("CREATE TABLE {table} ({columns})"))
                .execute(&mut **tx)
                .await?;
        }

        let mut records = 0;
        for (field, hashes) in &entry.records {
            let (sql, shared) = match self.columns.locate(*field)? {
                FieldLocation::BreachColumn { column } => (
                    format!(
                        "INSERT INTO {table} ({}) VALUES ($1)",
                        quote_identifier(column)?
                    ),
                    false,
                ),
                FieldLocation::SharedTable {
                    table: shared_table,
                    column,
                } => (
                    format!(
                        "INSERT INTO {} (breach_source, {}) VALUES ($2, $1)",
                        quote_identifier(shared_table)?,
                        quote_identifier(column)?
                    ),
                    true,
                ),
            };

            for hash in hashes {
                let mut query = sqlx::query(&sql).bind(hash);
                if shared {
                    query = query.bind(name);
                }
                query.execute(&mut **tx).await?;
            }
            records += hashes.len();
        }

        Ok(records)
    }

    /// Per-breach tables share a namespace with the catalog's own tables.
    fn is_reserved_table(&self, name: &str) -> bool {
        RESERVED_TABLES.contains(&name)
            || self
                .columns
                .shared_tables()
                .iter()
                .any(|(table, _)| *table == name)
    }

    /// Quoted columns of the per-breach table: one per declared personal field.
    fn personal_columns(&self, entry: &FixtureBreach) -> Result<Vec<String>> {
        let mut columns = Vec::new();
        for field in &entry.metadata.fields {
            if let FieldLocation::BreachColumn { column } = self.columns.locate(*field)? {
                columns.push(quote_identifier(column)?);
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BreachMetadata, IdentityField};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_personal_columns_follow_declared_fields() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/breach_radar")
            .unwrap();
        let loader = PgBreachLoader::new(pool, Arc::new(FieldColumnMap::standard()));
        let entry = FixtureBreach {
            metadata: BreachMetadata::new(
                "passwords_2020",
                "Password Dump",
                NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
                1_000,
                [IdentityField::Email, IdentityField::Password],
            ),
            records: BTreeMap::new(),
        };

        let columns = loader.personal_columns(&entry).unwrap();
        assert_eq!(columns, vec!["\"email\"".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_tables_are_reserved() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/breach_radar")
            .unwrap();
        let loader = PgBreachLoader::new(pool, Arc::new(FieldColumnMap::standard()));

        assert!(loader.is_reserved_table("breach_metadata"));
        assert!(loader.is_reserved_table("breach_password_data"));
        assert!(!loader.is_reserved_table("linkedin_2021"));
    }
}
