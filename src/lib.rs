//! # linksentry
//!
//! A concurrency-bounded link validation engine. Raw link occurrences from
//! any document parser are canonicalized, deduplicated, checked once per
//! distinct URL under global and per-host concurrency ceilings, and
//! classified into a fixed taxonomy of broken and suspicious links.
//!
//! ## Architecture
//!
//! - **core**: Fundamental types, error handling and constants
//! - **config**: Configuration loading, merging and validation
//! - **urls**: Canonicalization and the deduplication index
//! - **validation**: Per-host limiter, HTTP probe, retry policy and worker pool
//! - **classification**: Category taxonomy and the outcome classifier
//! - **reporting**: Aggregation, result sinks and logging
//! - **discovery**: Occurrence sources
//! - **ui**: CLI parsing, colors and progress reporting
//!
//! ## Example
//!
//! ```no_run
//! use linksentry::{Config, Engine, OccurrenceSource, TextSource};
//! use linksentry::reporting::ClassifiedResult;
//!
//! # async fn run() -> linksentry::Result<()> {
//! let engine = Engine::from_config(Config::default())?;
//! let source = TextSource::from_text("notes.txt", "see https://example.com");
//!
//! let mut results: Vec<ClassifiedResult> = Vec::new();
//! let summary = engine.run(source.into_stream(), &mut results).await?;
//! println!("{} of {} links healthy", summary.healthy(), summary.results());
//! # Ok(())
//! # }
//! ```

pub mod classification;
pub mod config;
pub mod core;
pub mod discovery;
pub mod engine;
pub mod reporting;
pub mod ui;
pub mod urls;
pub mod validation;

// Re-export commonly used items
pub use classification::{Category, Classifier, ClassifierPolicy};
pub use config::{CliConfig, Config};
pub use core::{LinkSentryError, Locator, RawOccurrence, Result, SourceLocation};
pub use discovery::{OccurrenceSource, TextSource};
pub use engine::Engine;
pub use reporting::{ClassifiedResult, JsonLinesSink, ResultSink, RunSummary, TextSink};
pub use urls::{CanonicalUrl, LinkKey, normalize};
pub use validation::{CheckOutcome, FailureKind, HttpProbe, Probe};
