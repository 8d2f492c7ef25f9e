use chrono::Utc;
use futures::FutureExt;
use log::{debug, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

use super::limiter::{AcquireError, HostLimiter};
use super::outcome::{CheckOutcome, FailureKind};
use super::probe::Probe;
use super::retry::{RetryDecision, RetryPolicy};
use crate::core::constants::http_status;
use crate::urls::{CanonicalUrl, UrlRecord};

/// A record whose check has ended, successfully or not
#[derive(Debug)]
pub struct Finished {
    pub record: Arc<UrlRecord>,
    pub outcome: CheckOutcome,
}

struct WorkerContext<P> {
    probe: Arc<P>,
    limiter: Arc<HostLimiter>,
    retry: RetryPolicy,
    total_timeout: Duration,
    cancel: CancellationToken,
}

impl<P: Probe> WorkerContext<P> {
    /// Full check of one URL: admission, attempts and retries, bounded by
    /// the cancellation token.
    async fn check(&self, url: &CanonicalUrl) -> CheckOutcome {
        let started = Instant::now();
        let checked_at = Utc::now();
        let attempts = AtomicU32::new(0);

        let mut outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                CheckOutcome::failed(url.to_string(), FailureKind::Cancelled)
            }
            outcome = self.attempts(url, &attempts) => outcome,
        };

        outcome.attempts = attempts.load(Ordering::Relaxed);
        outcome.checked_at = checked_at;
        outcome.latency = started.elapsed();
        outcome
    }

    /// The total timeout starts with the first granted slot, so time spent
    /// queueing behind other checks of the same host does not count. Once it
    /// runs, every later wait (cooldown, host slot, backoff) is bounded by it.
    async fn attempts(&self, url: &CanonicalUrl, counter: &AtomicU32) -> CheckOutcome {
        let host = url.host_key();
        let mut deadline: Option<Instant> = None;
        let mut last: Option<CheckOutcome> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let acquired = match deadline {
                None => self.limiter.acquire(&host).await,
                Some(deadline) => match timeout_at(deadline, self.limiter.acquire(&host)).await {
                    Ok(acquired) => acquired,
                    Err(_) => {
                        debug!("{url}: no slot for {host} before the total timeout");
                        return Self::out_of_time(url, last);
                    }
                },
            };
            let permit = match acquired {
                Ok(permit) => permit,
                Err(AcquireError::WaitExceeded(waited)) => {
                    debug!("{url}: no slot for {host} within {waited:?}");
                    return CheckOutcome::failed(url.to_string(), FailureKind::RateLimitWait);
                }
                Err(AcquireError::Closed) => {
                    return CheckOutcome::failed(url.to_string(), FailureKind::Cancelled);
                }
            };
            counter.store(attempt, Ordering::Relaxed);
            let check_deadline =
                *deadline.get_or_insert_with(|| Instant::now() + self.total_timeout);

            let outcome = match timeout_at(check_deadline, self.probe.probe(url)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!("{url}: exceeded total timeout of {:?}", self.total_timeout);
                    return CheckOutcome::failed(url.to_string(), FailureKind::Timeout);
                }
            };
            // Capacity is never held across a backoff
            self.limiter.release(permit);

            if outcome.status == Some(http_status::TOO_MANY_REQUESTS) {
                let pause = outcome
                    .retry_after
                    .unwrap_or_else(|| self.retry.backoff(attempt))
                    .min(self.retry.max_delay())
                    .min(check_deadline.saturating_duration_since(Instant::now()));
                debug!("{host} throttled us, cooling down for {pause:?}");
                self.limiter.cool_down(&host, pause);
            }

            match self.retry.decide(&outcome, attempt) {
                RetryDecision::Done => return outcome,
                RetryDecision::RetryAfter(delay) if Instant::now() + delay >= check_deadline => {
                    debug!("{url}: no time left for another attempt");
                    return outcome;
                }
                RetryDecision::RetryAfter(delay) => {
                    debug!(
                        "{url}: attempt {attempt} gave {}, retrying in {delay:?}",
                        outcome.describe()
                    );
                    last = Some(outcome);
                    sleep(delay).await;
                }
            }
        }
    }

    /// Result when the total timeout ends while waiting to retry.
    ///
    /// A throttled check keeps its 429 so it is reported as rate limited.
    fn out_of_time(url: &CanonicalUrl, last: Option<CheckOutcome>) -> CheckOutcome {
        match last {
            Some(outcome) if outcome.status == Some(http_status::TOO_MANY_REQUESTS) => outcome,
            _ => CheckOutcome::failed(url.to_string(), FailureKind::Timeout),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("check panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("check panicked: {message}")
    } else {
        "check panicked".to_string()
    }
}

/// Bounded executor of checks. One task per admitted record.
///
/// Spawning is unbounded; the limiter decides how many checks are actually
/// talking to the network, so a waiting task holds no capacity.
pub struct WorkerPool<P> {
    context: Arc<WorkerContext<P>>,
    tasks: JoinSet<Finished>,
    submitted: usize,
}

impl<P: Probe + 'static> WorkerPool<P> {
    pub fn new(
        probe: Arc<P>,
        limiter: Arc<HostLimiter>,
        retry: RetryPolicy,
        total_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context: Arc::new(WorkerContext {
                probe,
                limiter,
                retry,
                total_timeout,
                cancel,
            }),
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    /// Start checking a record. Returns false when the record is malformed or
    /// was already started, so each record is checked at most once.
    pub fn submit(&mut self, record: Arc<UrlRecord>) -> bool {
        let Some(url) = record.key().canonical().cloned() else {
            return false;
        };
        if !record.begin() {
            return false;
        }

        let context = Arc::clone(&self.context);
        self.tasks.spawn(async move {
            let outcome = AssertUnwindSafe(context.check(&url))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    CheckOutcome::failed(
                        url.to_string(),
                        FailureKind::Internal(panic_message(panic.as_ref())),
                    )
                });
            Finished { record, outcome }
        });
        self.submitted += 1;
        true
    }

    /// Wait for the next finished check. `None` once nothing is running.
    pub async fn next_finished(&mut self) -> Option<Finished> {
        loop {
            match self.tasks.join_next().await? {
                Ok(finished) => return Some(finished),
                // Only aborted tasks end up here; their records are swept by the caller
                Err(err) => warn!("Worker task ended without a result: {err}"),
            }
        }
    }

    /// Checks started so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Checks started but not yet collected
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn limiter(&self) -> &HostLimiter {
        &self.context.limiter
    }
}
