//! Query orchestration: classify a user query, then run either a focused
//! single-pass search or the fixed multi-pass battery with merge/dedup.

pub mod classifier;
pub mod multi_pass;
pub mod plan;
pub mod single_pass;
