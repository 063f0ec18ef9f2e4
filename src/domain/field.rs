//! Identity field vocabulary
//!
//! Every hashed attribute a caller can search for is one of a fixed set of
//! identity fields. Anything outside this vocabulary is rejected at parse
//! time, so storage adapters never see an unknown field name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::infra::BreachError;

/// A named identity attribute type stored (hashed) in breach datasets.
///
/// Wire keys are camelCase (`firstName`, `zipCode`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    Email,
    FirstName,
    LastName,
    Phone,
    Username,
    Address,
    City,
    State,
    ZipCode,
    Country,
    DateOfBirth,
    Ssn,
    CreditCard,
    DriverLicense,
    Passport,
    Password,
}

impl IdentityField {
    /// Every field in the vocabulary, personal fields first.
    pub const ALL: [IdentityField; 16] = [
        IdentityField::Email,
        IdentityField::FirstName,
        IdentityField::LastName,
        IdentityField::Phone,
        IdentityField::Username,
        IdentityField::Address,
        IdentityField::City,
        IdentityField::State,
        IdentityField::ZipCode,
        IdentityField::Country,
        IdentityField::DateOfBirth,
        IdentityField::Ssn,
        IdentityField::CreditCard,
        IdentityField::DriverLicense,
        IdentityField::Passport,
        IdentityField::Password,
    ];

    /// Wire key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Email => "email",
            IdentityField::FirstName => "firstName",
            IdentityField::LastName => "lastName",
            IdentityField::Phone => "phone",
            IdentityField::Username => "username",
            IdentityField::Address => "address",
            IdentityField::City => "city",
            IdentityField::State => "state",
            IdentityField::ZipCode => "zipCode",
            IdentityField::Country => "country",
            IdentityField::DateOfBirth => "dateOfBirth",
            IdentityField::Ssn => "ssn",
            IdentityField::CreditCard => "creditCard",
            IdentityField::DriverLicense => "driverLicense",
            IdentityField::Passport => "passport",
            IdentityField::Password => "password",
        }
    }

    /// Sensitive fields are only ever searched by prefix.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            IdentityField::Ssn
                | IdentityField::CreditCard
                | IdentityField::DriverLicense
                | IdentityField::Passport
                | IdentityField::Password
        )
    }

    /// Parse a wire key, returning `None` for anything outside the vocabulary.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityField {
    type Err = BreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BreachError::UnsupportedField(s.to_string()))
    }
}
