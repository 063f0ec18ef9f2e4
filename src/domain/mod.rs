//! Domain models for Breach Radar
//!
//! Breach metadata, the identity field vocabulary, search requests,
//! correlation results and their display formatting.

mod breach;
mod field;
pub mod format;
mod search;

pub use breach::*;
pub use field::*;
pub use format::{
    format_date, format_record_count, summarize_candidate, summarize_match, BreachSummary,
    CandidateSummary, MatchSummary,
};
pub use search::*;
