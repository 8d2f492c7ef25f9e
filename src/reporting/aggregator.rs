use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::classification::Category;
use crate::core::error::Result;
use crate::core::types::SourceLocation;
use crate::reporting::logging;
use crate::urls::UrlRecord;
use crate::validation::outcome::CheckOutcome;

/// Final, self-contained record for one distinct link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedResult {
    pub url: String,
    pub category: Category,
    pub outcome: CheckOutcome,
    pub source_locations: Vec<SourceLocation>,
}

impl ClassifiedResult {
    pub fn is_healthy(&self) -> bool {
        self.category.is_healthy()
    }
}

/// Consumer of finalized results.
pub trait ResultSink: Send {
    fn emit(&mut self, result: ClassifiedResult) -> Result<()>;

    /// Called once after the last result
    fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}

impl ResultSink for Vec<ClassifiedResult> {
    fn emit(&mut self, result: ClassifiedResult) -> Result<()> {
        self.push(result);
        Ok(())
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Counters describing a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Raw occurrences received, duplicates included
    pub occurrences: usize,
    /// Distinct links, malformed ones included
    pub unique_urls: usize,
    /// Network checks started
    pub checks_issued: usize,
    /// Distinct links that could not be normalized
    pub malformed: usize,
    /// Occurrences skipped by exclude patterns
    pub excluded: usize,
    pub by_category: BTreeMap<Category, usize>,
    /// The run was aborted before every check completed
    pub cancelled: bool,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl RunSummary {
    /// Number of results emitted
    pub fn results(&self) -> usize {
        self.by_category.values().sum()
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn healthy(&self) -> usize {
        self.count(Category::Healthy)
    }

    pub fn issues(&self) -> usize {
        self.results() - self.healthy()
    }

    pub fn all_healthy(&self) -> bool {
        self.issues() == 0
    }

    /// Percentage of healthy results; an empty run counts as fully healthy
    pub fn success_rate(&self) -> f64 {
        let results = self.results();
        if results == 0 {
            return 100.0;
        }
        self.healthy() as f64 / results as f64 * 100.0
    }
}

/// Merges classifications with location sets and emits each record once.
///
/// Completions are parked until discovery is closed so that every emitted
/// result carries the complete location set. After that they are emitted
/// as they arrive.
pub struct Aggregator<'a> {
    sink: &'a mut dyn ResultSink,
    parked: Vec<(Arc<UrlRecord>, Category, CheckOutcome)>,
    discovery_closed: bool,
    summary: RunSummary,
}

impl<'a> Aggregator<'a> {
    pub fn new(sink: &'a mut dyn ResultSink) -> Self {
        Self {
            sink,
            parked: Vec::new(),
            discovery_closed: false,
            summary: RunSummary::default(),
        }
    }

    /// Hand over a classified completion
    pub fn complete(
        &mut self,
        record: Arc<UrlRecord>,
        category: Category,
        outcome: CheckOutcome,
    ) -> Result<()> {
        if !self.discovery_closed {
            self.parked.push((record, category, outcome));
            return Ok(());
        }

        if let Some(result) = self.finalize(&record, category, outcome) {
            self.sink.emit(result)?;
        }
        Ok(())
    }

    /// No more occurrences will arrive; flush everything parked so far
    pub fn close_discovery(&mut self) -> Result<()> {
        self.discovery_closed = true;
        for (record, category, outcome) in std::mem::take(&mut self.parked) {
            if let Some(result) = self.finalize(&record, category, outcome) {
                self.sink.emit(result)?;
            }
        }
        Ok(())
    }

    /// Transition the record to Done and build its result.
    ///
    /// Returns `None` when the record was already finalized.
    pub fn finalize(
        &mut self,
        record: &UrlRecord,
        category: Category,
        outcome: CheckOutcome,
    ) -> Option<ClassifiedResult> {
        let source_locations = record.complete()?;
        *self.summary.by_category.entry(category).or_insert(0) += 1;
        if category == Category::Cancelled {
            self.summary.cancelled = true;
        }

        let result = ClassifiedResult {
            url: record.key().to_string(),
            category,
            outcome,
            source_locations,
        };
        logging::log_result(&result);
        Some(result)
    }

    pub fn is_discovery_closed(&self) -> bool {
        self.discovery_closed
    }

    /// Completions waiting for discovery to close
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn summary_mut(&mut self) -> &mut RunSummary {
        &mut self.summary
    }

    /// Tell the sink the run is over and hand back the summary
    pub fn finish(self) -> Result<RunSummary> {
        self.sink.finish(&self.summary)?;
        Ok(self.summary)
    }
}
