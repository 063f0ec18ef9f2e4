//! API layer for Breach Radar
//!
//! REST endpoints for exact and prefix searches plus catalog browsing.

pub mod error;
pub mod handlers;
mod rest;
pub mod types;
mod utils;

pub use error::{ApiError, ErrorCode};
pub use rest::*;
pub use utils::ApiJson;
