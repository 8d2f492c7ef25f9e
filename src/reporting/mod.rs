//! Aggregation and reporting
//!
//! This module merges classified outcomes with their source locations,
//! defines the result sink seam and the bundled text and JSON sinks, and
//! holds the structured logging helpers.

pub mod aggregator;
pub mod logging;
pub mod output;

// Re-export commonly used items
pub use aggregator::{Aggregator, ClassifiedResult, ResultSink, RunSummary};
pub use output::{JsonLinesSink, TextSink};
