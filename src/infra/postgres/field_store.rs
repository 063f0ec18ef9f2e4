//! PostgreSQL-backed field store
//!
//! Personal fields are read from the table named after the breach; sensitive
//! fields from the shared per-field table filtered on `breach_source`. All
//! identifiers come from the injected [`FieldColumnMap`] or the catalog and
//! pass `quote_identifier`; hash values are always bound parameters.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{BreachName, IdentityField};
use crate::infra::column_map::quote_identifier;
use crate::infra::{BreachError, FieldColumnMap, FieldLocation, FieldStore, Result};

/// PostgreSQL field store
pub struct PgFieldStore {
    pool: PgPool,
    columns: Arc<FieldColumnMap>,
}

impl PgFieldStore {
    /// Create a new PostgreSQL field store with the given column allow-list
    pub fn new(pool: PgPool, columns: Arc<FieldColumnMap>) -> Self {
        Self { pool, columns }
    }

    fn exact_query(&self, breach: &BreachName, field: IdentityField) -> Result<String> {
        Ok(match self.columns.locate(field)? {
            FieldLocation::BreachColumn { column } => {
                let table = quote_identifier(breach.as_str())?;
                let column = quote_identifier(column)?;
                format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE {column} = $1)")
            }
            FieldLocation::SharedTable { table, column } => {
                let table = quote_identifier(table)?;
                let column = quote_identifier(column)?;
                format!(
                    "SELECT EXISTS (SELECT 1 FROM {table} WHERE {column} = $1 AND breach_source = $2)"
                )
            }
        })
    }

    fn prefix_query(&self, breach: &BreachName, field: IdentityField) -> Result<String> {
        Ok(match self.columns.locate(field)? {
            FieldLocation::BreachColumn { column } => {
                let table = quote_identifier(breach.as_str())?;
                let column = quote_identifier(column)?;
                format!(
                    "SELECT DISTINCT {column} FROM {table} \
                     WHERE {column} LIKE $1 ESCAPE '\\' \
                     ORDER BY {column} LIMIT $2"
                )
            }
            FieldLocation::SharedTable { table, column } => {
                let table = quote_identifier(table)?;
                let column = quote_identifier(column)?;
                format!(
                    "SELECT DISTINCT {column} FROM {table} \
                     WHERE {column} LIKE $1 ESCAPE '\\' AND breach_source = $3 \
                     ORDER BY {column} LIMIT $2"
                )
            }
        })
    }

    fn is_shared(&self, field: IdentityField) -> Result<bool> {
        Ok(matches!(
            self.columns.locate(field)?,
            FieldLocation::SharedTable { .. }
        ))
    }
}

/// Escape LIKE metacharacters so the prefix only ever matches literally.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl FieldStore for PgFieldStore {
    async fn test_exact_hash(
        &self,
        breach: &BreachName,
        field: IdentityField,
        hash: &str,
    ) -> Result<bool> {
        let sql = self.exact_query(breach, field)?;
        debug!(breach = %breach, field = %field, "Exact hash lookup");

        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(hash);
        if self.is_shared(field)? {
            query = query.bind(breach.as_str());
        }

        query
            .fetch_one(&self.pool)
            .await
            .map_err(BreachError::Database)
    }

    async fn query_hash_prefix(
        &self,
        breach: &BreachName,
        field: IdentityField,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let sql = self.prefix_query(breach, field)?;
        debug!(breach = %breach, field = %field, prefix_len = prefix.len(), "Prefix hash lookup");

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut query = sqlx::query_scalar::<_, String>(&sql)
            .bind(like_prefix_pattern(prefix))
            .bind(limit);
        if self.is_shared(field)? {
            query = query.bind(breach.as_str());
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(BreachError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_pattern_escapes_metacharacters() {
        assert_eq!(like_prefix_pattern("a1b2"), "a1b2%");
        assert_eq!(like_prefix_pattern(""), "%");
        assert_eq!(like_prefix_pattern("a%b_c\\"), "a\\%b\\_c\\\\%");
    }

    #[tokio::test]
    async fn test_queries_quote_identifiers() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/breach_radar")
            .unwrap();
        let store = PgFieldStore::new(pool, Arc::new(FieldColumnMap::standard()));
        let breach = BreachName::from("breach_linkedin_2021");

        let sql = store.exact_query(&breach, IdentityField::FirstName).unwrap();
        assert_eq!(
            sql,
            "SELECT EXISTS (SELECT 1 FROM \"breach_linkedin_2021\" WHERE \"first_name\" = $1)"
        );

        let sql = store.prefix_query(&breach, IdentityField::Password).unwrap();
        assert!(sql.contains("FROM \"breach_password_data\""));
        assert!(sql.contains("breach_source = $3"));
        assert!(sql.contains("LIKE $1 ESCAPE '\\'"));
    }

    #[tokio::test]
    async fn test_hostile_breach_name_rejected() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/breach_radar")
            .unwrap();
        let store = PgFieldStore::new(pool, Arc::new(FieldColumnMap::standard()));
        let breach = BreachName::from("x\"; DROP TABLE breach_metadata; --");

        assert!(matches!(
            store.exact_query(&breach, IdentityField::Email),
            Err(BreachError::InvalidIdentifier(_))
        ));
    }
}
