//! REST API handlers organized by concern.

pub mod catalog;
pub mod health;
pub mod search;

pub use catalog::*;
pub use health::*;
pub use search::*;
