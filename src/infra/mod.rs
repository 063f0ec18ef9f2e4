//! Infrastructure layer for Breach Radar
//!
//! Contains the storage ports consumed by the correlation engine and their
//! implementations:
//! - Breach catalog and field store traits
//! - Field → column allow-list
//! - JSON breach fixtures
//! - PostgreSQL adapters and bulk loader
//! - In-memory adapter (fixtures, tests)

pub mod column_map;
mod error;
mod fixture;
mod memory;
pub mod postgres;
mod traits;

pub use column_map::{FieldColumnMap, FieldLocation};
pub use error::*;
pub use fixture::{BreachFixture, FixtureBreach};
pub use memory::InMemoryBreachStore;
pub use postgres::{LoadSummary, PgBreachCatalog, PgBreachLoader, PgFieldStore};
pub use traits::*;
