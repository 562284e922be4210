//! Aggregation helpers for analysis results.

pub mod aggregator;

pub use aggregator::*;
