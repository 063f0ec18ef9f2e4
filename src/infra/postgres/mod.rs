//! PostgreSQL implementations of the storage ports
//!
//! Provides the catalog reader, the per-breach field store and the fixture
//! loader used by the production Breach Radar service.

mod catalog;
mod field_store;
mod loader;

pub use catalog::*;
pub use field_store::*;
pub use loader::*;
