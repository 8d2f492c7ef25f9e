//! The link validation engine
//!
//! Wires the pipeline together: occurrences are filtered, normalized and
//! admitted into the dedup index, admitted records are checked by the
//! worker pool, outcomes are classified and handed to the aggregator, which
//! emits one result per distinct link to the caller's sink.

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use regex::Regex;
use std::sync::Arc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::classification::{Classifier, ClassifierPolicy};
use crate::config::Config;
use crate::core::error::Result;
use crate::core::types::RawOccurrence;
use crate::reporting::logging;
use crate::reporting::{Aggregator, ResultSink, RunSummary};
use crate::ui::ProgressReporter;
use crate::urls::{Admission, DedupIndex, LinkKey, clean_raw, normalize};
use crate::validation::{
    CheckOutcome, FailureKind, Finished, HostLimiter, HttpProbe, Probe, RetryPolicy, WorkerPool,
};

/// Per-run counters the aggregator does not track itself
#[derive(Debug, Default)]
struct IntakeCounts {
    excluded: usize,
    malformed: usize,
}

/// Validates every distinct link of an occurrence stream exactly once.
pub struct Engine<P> {
    config: Config,
    probe: Arc<P>,
    exclude: Vec<Regex>,
    classifier: Classifier,
    cancel: CancellationToken,
}

impl Engine<HttpProbe> {
    /// Engine backed by the HTTP probe
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let probe = HttpProbe::new(&config)?;
        Self::with_probe(config, Arc::new(probe))
    }
}

impl<P: Probe + 'static> Engine<P> {
    /// Engine backed by any probe. Fails on invalid configuration, before
    /// any check starts.
    pub fn with_probe(config: Config, probe: Arc<P>) -> Result<Self> {
        config.validate()?;
        let exclude = config.compile_exclude_patterns()?;
        let classifier = Classifier::new(ClassifierPolicy::from_config(&config));

        Ok(Self {
            config,
            probe,
            exclude,
            classifier,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancelling this token aborts the current run and every later one.
    /// Unfinished links are reported as cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run<S>(&self, input: S, sink: &mut dyn ResultSink) -> Result<RunSummary>
    where
        S: Stream<Item = RawOccurrence>,
    {
        self.run_with_progress(input, sink, None).await
    }

    /// Consume `input` to the end (or until cancelled) and emit one result
    /// per distinct link. Only a failing sink ends the run with an error.
    pub async fn run_with_progress<S>(
        &self,
        input: S,
        sink: &mut dyn ResultSink,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunSummary>
    where
        S: Stream<Item = RawOccurrence>,
    {
        let started = Instant::now();
        let cancel = self.cancel.child_token();
        let limiter = Arc::new(HostLimiter::from_config(&self.config));
        let mut pool = WorkerPool::new(
            Arc::clone(&self.probe),
            Arc::clone(&limiter),
            RetryPolicy::from_config(&self.config),
            self.config.total_timeout_duration(),
            cancel.clone(),
        );
        let index = DedupIndex::new();
        let mut aggregator = Aggregator::new(sink);
        let mut counts = IntakeCounts::default();

        let run_timeout = self.config.run_timeout_duration();
        let deadline = async {
            match run_timeout {
                Some(limit) => sleep_until(started + limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        let mut deadline = std::pin::pin!(deadline);
        let mut input = std::pin::pin!(input);
        let mut input_open = true;
        let mut timed_out = false;

        loop {
            if !input_open && pool.is_idle() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled(), if input_open => {
                    info!("Run cancelled, no further links are read");
                    input_open = false;
                    aggregator.close_discovery()?;
                }

                _ = &mut deadline, if !timed_out => {
                    if let Some(limit) = run_timeout {
                        warn!("Run timeout of {}s reached, cancelling", limit.as_secs());
                    }
                    timed_out = true;
                    cancel.cancel();
                }

                finished = pool.next_finished(), if !pool.is_idle() => {
                    if let Some(finished) = finished {
                        self.complete(&mut aggregator, finished)?;
                        if let Some(progress) = progress {
                            progress.inc_checked();
                        }
                    }
                }

                next = input.next(), if input_open => match next {
                    Some(occurrence) => {
                        self.admit(occurrence, &index, &mut pool, &mut aggregator, &mut counts, progress)?;
                    }
                    None => {
                        debug!("Input exhausted with {} distinct link(s)", index.len());
                        input_open = false;
                        aggregator.close_discovery()?;
                        if let Some(progress) = progress {
                            progress.discovery_finished();
                        }
                    }
                },
            }
        }

        let cancelled = cancel.is_cancelled();
        for record in index.unfinished() {
            let kind = if cancelled {
                FailureKind::Cancelled
            } else {
                FailureKind::Internal("check never reported back".to_string())
            };
            let outcome = CheckOutcome::failed(record.key().to_string(), kind);
            let category = self.classifier.classify(&outcome);
            aggregator.complete(record, category, outcome)?;
            if let Some(progress) = progress {
                progress.inc_checked();
            }
        }
        limiter.close();

        let summary = aggregator.summary_mut();
        summary.occurrences = index.occurrences() + counts.excluded;
        summary.unique_urls = index.len();
        summary.checks_issued = pool.submitted();
        summary.malformed = counts.malformed;
        summary.excluded = counts.excluded;
        summary.cancelled |= cancelled;
        summary.duration = started.elapsed();
        logging::log_discovery_complete(summary);

        let summary = aggregator.finish()?;
        logging::log_run_complete(&summary);
        Ok(summary)
    }

    fn is_excluded(&self, raw_url: &str) -> bool {
        self.exclude.iter().any(|pattern| pattern.is_match(raw_url))
    }

    fn admit(
        &self,
        occurrence: RawOccurrence,
        index: &DedupIndex,
        pool: &mut WorkerPool<P>,
        aggregator: &mut Aggregator<'_>,
        counts: &mut IntakeCounts,
        progress: Option<&ProgressReporter>,
    ) -> Result<()> {
        let (raw_url, location) = occurrence.into_parts();
        if self.is_excluded(&raw_url) {
            debug!("Excluded {raw_url} at {location}");
            counts.excluded += 1;
            return Ok(());
        }

        let (key, problem) = match normalize(&raw_url) {
            Ok(url) => (LinkKey::Canonical(url), None),
            Err(err) => (
                LinkKey::Malformed(clean_raw(&raw_url).into_owned()),
                Some(err.to_string()),
            ),
        };

        let Admission::Admitted(record) = index.admit(key, location) else {
            return Ok(());
        };
        if let Some(progress) = progress {
            progress.inc_length();
        }

        match problem {
            Some(problem) => {
                debug!("Malformed link {raw_url}: {problem}");
                counts.malformed += 1;
                let outcome =
                    CheckOutcome::failed(record.key().to_string(), FailureKind::Malformed(problem));
                let category = self.classifier.classify(&outcome);
                aggregator.complete(record, category, outcome)?;
                if let Some(progress) = progress {
                    progress.inc_checked();
                }
            }
            None => {
                pool.submit(record);
            }
        }
        Ok(())
    }

    fn complete(&self, aggregator: &mut Aggregator<'_>, finished: Finished) -> Result<()> {
        let Finished { record, outcome } = finished;
        let category = self.classifier.classify(&outcome);
        aggregator.complete(record, category, outcome)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::classification::Category;
    use crate::core::types::SourceLocation;
    use crate::reporting::ClassifiedResult;
    use crate::urls::CanonicalUrl;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 200 for everything except paths containing "missing"
    #[derive(Default)]
    struct StaticProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for StaticProbe {
        async fn probe(&self, url: &CanonicalUrl) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if url.to_string().contains("missing") { 404 } else { 200 };
            CheckOutcome::new(url.to_string()).with_status(status)
        }
    }

    /// Never answers
    struct HangingProbe;

    #[async_trait]
    impl Probe for HangingProbe {
        async fn probe(&self, _url: &CanonicalUrl) -> CheckOutcome {
            std::future::pending().await
        }
    }

    fn occurrence(url: &str, document: &str, line: u64) -> RawOccurrence {
        RawOccurrence::new(url.to_string(), SourceLocation::line(document, line)).unwrap()
    }

    fn test_config() -> Config {
        Config {
            retry_limit: Some(0),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_engine__one_check_per_distinct_link() {
        let probe = Arc::new(StaticProbe::default());
        let engine = Engine::with_probe(test_config(), Arc::clone(&probe)).unwrap();
        let input = stream::iter(vec![
            occurrence("https://example.com/a", "a.md", 1),
            occurrence("https://EXAMPLE.com/a/", "a.md", 9),
            occurrence("https://example.com:443/a", "b.md", 3),
            occurrence("https://example.com/missing", "b.md", 4),
        ]);

        let mut results: Vec<ClassifiedResult> = Vec::new();
        let summary = engine.run(input, &mut results).await.unwrap();

        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(summary.occurrences, 4);
        assert_eq!(summary.unique_urls, 2);
        assert_eq!(summary.checks_issued, 2);
        assert_eq!(summary.healthy(), 1);
        assert_eq!(summary.count(Category::Dead), 1);

        let healthy = results
            .iter()
            .find(|result| result.url == "https://example.com/a")
            .unwrap();
        assert_eq!(healthy.source_locations.len(), 3);
    }

    #[tokio::test]
    async fn test_engine__malformed_links_fan_in_without_checks() {
        let probe = Arc::new(StaticProbe::default());
        let engine = Engine::with_probe(test_config(), Arc::clone(&probe)).unwrap();
        let input = stream::iter(vec![
            occurrence("ftp://files.example.com/x", "a.md", 1),
            occurrence("<ftp://files.example.com/x>", "a.md", 2),
        ]);

        let mut results: Vec<ClassifiedResult> = Vec::new();
        let summary = engine.run(input, &mut results).await.unwrap();

        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::Malformed);
        assert_eq!(results[0].source_locations.len(), 2);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.checks_issued, 0);
    }

    #[tokio::test]
    async fn test_engine__exclude_patterns_skip_occurrences() {
        let probe = Arc::new(StaticProbe::default());
        let config = Config {
            exclude_patterns: Some(vec!["localhost".to_string()]),
            ..test_config()
        };
        let engine = Engine::with_probe(config, Arc::clone(&probe)).unwrap();
        let input = stream::iter(vec![
            occurrence("http://localhost:8080/x", "a.md", 1),
            occurrence("https://example.com", "a.md", 2),
        ]);

        let mut results: Vec<ClassifiedResult> = Vec::new();
        let summary = engine.run(input, &mut results).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.occurrences, 2);
        assert_eq!(summary.unique_urls, 1);
    }

    #[tokio::test]
    async fn test_engine__invalid_config_is_rejected() {
        let config = Config {
            max_concurrency: Some(0),
            ..Config::default()
        };
        assert!(Engine::with_probe(config, Arc::new(StaticProbe::default())).is_err());

        let config = Config {
            exclude_patterns: Some(vec!["(".to_string()]),
            ..Config::default()
        };
        assert!(Engine::with_probe(config, Arc::new(StaticProbe::default())).is_err());
    }

    #[tokio::test]
    async fn test_engine__run_timeout_cancels_everything() {
        let config = Config {
            run_timeout: Some(1),
            ..test_config()
        };
        let engine = Engine::with_probe(config, Arc::new(HangingProbe)).unwrap();
        let input = stream::iter(vec![
            occurrence("https://a.example.com", "a.md", 1),
            occurrence("https://b.example.com", "a.md", 2),
        ]);

        let mut results: Vec<ClassifiedResult> = Vec::new();
        let summary = tokio::time::timeout(Duration::from_secs(10), engine.run(input, &mut results))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|result| result.category == Category::Cancelled));
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn test_engine__cancelled_before_start_reads_nothing() {
        let probe = Arc::new(StaticProbe::default());
        let engine = Engine::with_probe(test_config(), Arc::clone(&probe)).unwrap();
        engine.cancellation_token().cancel();

        let input = stream::iter(vec![occurrence("https://example.com", "a.md", 1)]);
        let mut results: Vec<ClassifiedResult> = Vec::new();
        let summary = engine.run(input, &mut results).await.unwrap();

        assert!(results.is_empty());
        assert!(summary.cancelled);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }
}
