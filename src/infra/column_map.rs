//! Field → physical storage allow-list
//!
//! Built once at startup and injected into the storage adapter. Personal
//! fields live in a column of the per-breach table; sensitive fields live in
//! one shared table per field keyed by `breach_source`.

use std::collections::BTreeMap;

use crate::domain::IdentityField;

use super::{BreachError, Result};

/// Where a field's hashes are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocation {
    /// Column of the table named after the breach
    BreachColumn { column: String },
    /// Shared table holding `(breach_source, column)` rows for every breach
    SharedTable { table: String, column: String },
}

/// Immutable allow-list mapping identity fields to storage locations.
#[derive(Debug, Clone)]
pub struct FieldColumnMap {
    locations: BTreeMap<IdentityField, FieldLocation>,
}

impl FieldColumnMap {
    /// Build a map from explicit entries, validating every identifier.
    pub fn new(entries: impl IntoIterator<Item = (IdentityField, FieldLocation)>) -> Result<Self> {
        let mut locations = BTreeMap::new();
        for (field, location) in entries {
            match &location {
                FieldLocation::BreachColumn { column } => {
                    validate_identifier(column)?;
                }
                FieldLocation::SharedTable { table, column } => {
                    validate_identifier(table)?;
                    validate_identifier(column)?;
                }
            }
            locations.insert(field, location);
        }
        Ok(Self { locations })
    }

    /// The production layout.
    pub fn standard() -> Self {
        let column = |c: &str| FieldLocation::BreachColumn {
            column: c.to_string(),
        };
        let shared = |t: &str, c: &str| FieldLocation::SharedTable {
            table: t.to_string(),
            column: c.to_string(),
        };

        let locations = BTreeMap::from([
            (IdentityField::Email, column("email")),
            (IdentityField::FirstName, column("first_name")),
            (IdentityField::LastName, column("last_name")),
            (IdentityField::Phone, column("phone")),
            (IdentityField::Username, column("username")),
            (IdentityField::Address, column("address")),
            (IdentityField::City, column("city")),
            (IdentityField::State, column("state")),
            (IdentityField::ZipCode, column("zip_code")),
            (IdentityField::Country, column("country")),
            (IdentityField::DateOfBirth, column("date_of_birth")),
            (IdentityField::Ssn, shared("breach_ssn_data", "ssn_hash")),
            (
                IdentityField::CreditCard,
                shared("breach_credit_card_data", "credit_card_hash"),
            ),
            (
                IdentityField::DriverLicense,
                shared("breach_license_data", "driver_license_hash"),
            ),
            (
                IdentityField::Passport,
                shared("breach_passport_data", "passport_hash"),
            ),
            (
                IdentityField::Password,
                shared("breach_password_data", "password_hash"),
            ),
        ]);

        Self { locations }
    }

    /// Storage location for `field`, `UnsupportedField` when unmapped.
    pub fn locate(&self, field: IdentityField) -> Result<&FieldLocation> {
        self.locations
            .get(&field)
            .ok_or_else(|| BreachError::UnsupportedField(field.to_string()))
    }

    pub fn is_mapped(&self, field: IdentityField) -> bool {
        self.locations.contains_key(&field)
    }

    /// Distinct shared tables with their hash column.
    pub fn shared_tables(&self) -> Vec<(&str, &str)> {
        let mut tables: Vec<(&str, &str)> = self
            .locations
            .values()
            .filter_map(|location| match location {
                FieldLocation::SharedTable { table, column } => {
                    Some((table.as_str(), column.as_str()))
                }
                FieldLocation::BreachColumn { .. } => None,
            })
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }
}

impl Default for FieldColumnMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// Accept only lowercase ASCII identifiers (`[a-z_][a-z0-9_]*`, at most 63 bytes).
pub fn validate_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && ident.len() <= 63 {
        Ok(())
    } else {
        Err(BreachError::InvalidIdentifier(ident.to_string()))
    }
}

/// Validate and double-quote an identifier for interpolation into SQL.
pub fn quote_identifier(ident: &str) -> Result<String> {
    validate_identifier(ident)?;
    Ok(format!("\"{ident}\""))
}
