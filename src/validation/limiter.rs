//! Admission control for outgoing checks.
//!
//! Every check needs one slot of its host and one global slot. The host
//! slot is taken first, so at most `max_per_host` waiters of a busy host
//! can sit in the global queue ahead of another host.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, sleep_until, timeout};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// No slot was granted within the wait bound
    WaitExceeded(Duration),
    /// The limiter was shut down
    Closed,
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::WaitExceeded(waited) => {
                write!(f, "no host slot within {}s", waited.as_secs_f64())
            }
            AcquireError::Closed => write!(f, "limiter closed"),
        }
    }
}

impl std::error::Error for AcquireError {}

impl From<tokio::sync::AcquireError> for AcquireError {
    fn from(_: tokio::sync::AcquireError) -> Self {
        AcquireError::Closed
    }
}

/// Global plus per-host concurrency ceiling with 429 cooldowns.
#[derive(Debug)]
pub struct HostLimiter {
    global: Arc<Semaphore>,
    hosts: DashMap<String, Arc<Semaphore>>,
    cooldowns: DashMap<String, Instant>,
    max_per_host: usize,
    wait_limit: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl HostLimiter {
    pub fn new(max_concurrency: usize, max_per_host: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(max_concurrency)),
            hosts: DashMap::new(),
            cooldowns: DashMap::new(),
            max_per_host,
            wait_limit: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_concurrency(), config.max_per_host_concurrency())
            .with_wait_limit(config.host_wait_limit_duration())
    }

    /// Fail acquisitions that wait longer than `limit`
    pub fn with_wait_limit(mut self, limit: Duration) -> Self {
        self.wait_limit = Some(limit);
        self
    }

    /// Suspend until both a host slot and a global slot are free.
    ///
    /// Waiters of one host are served in FIFO order. Dropping the future
    /// while it waits gives back anything already acquired.
    pub async fn acquire(&self, host: &str) -> Result<HostPermit, AcquireError> {
        match self.wait_limit {
            Some(limit) => timeout(limit, self.acquire_unbounded(host))
                .await
                .map_err(|_| AcquireError::WaitExceeded(limit))?,
            None => self.acquire_unbounded(host).await,
        }
    }

    async fn acquire_unbounded(&self, host: &str) -> Result<HostPermit, AcquireError> {
        self.wait_for_cooldown(host).await;

        let host_semaphore = Arc::clone(
            self.hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_host)))
                .value(),
        );
        let host_permit = host_semaphore.acquire_owned().await?;
        let global_permit = Arc::clone(&self.global).acquire_owned().await?;

        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(current, Ordering::AcqRel);

        Ok(HostPermit {
            host: host.to_string(),
            in_flight: Arc::clone(&self.in_flight),
            _global: global_permit,
            _host: host_permit,
        })
    }

    async fn wait_for_cooldown(&self, host: &str) {
        loop {
            let until = self.cooldowns.get(host).map(|entry| *entry.value());
            match until {
                Some(until) if until > Instant::now() => sleep_until(until).await,
                _ => break,
            }
        }
    }

    /// Give a permit back. Equivalent to dropping it.
    pub fn release(&self, permit: HostPermit) {
        drop(permit);
    }

    /// Hold back new acquisitions for `host` for `duration`.
    ///
    /// Overlapping cooldowns keep the later deadline.
    pub fn cool_down(&self, host: &str, duration: Duration) {
        let until = Instant::now() + duration;
        self.cooldowns
            .entry(host.to_string())
            .and_modify(|current| *current = (*current).max(until))
            .or_insert(until);
    }

    pub fn cooldown_remaining(&self, host: &str) -> Option<Duration> {
        let until = *self.cooldowns.get(host)?.value();
        until.checked_duration_since(Instant::now())
    }

    /// Checks currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneously held permits so far
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    pub fn available_global(&self) -> usize {
        self.global.available_permits()
    }

    /// Wake every waiter with `AcquireError::Closed`
    pub fn close(&self) {
        self.global.close();
        for entry in self.hosts.iter() {
            entry.value().close();
        }
    }
}

/// Proof of admission. Both slots are returned when this is dropped.
#[derive(Debug)]
pub struct HostPermit {
    host: String,
    in_flight: Arc<AtomicUsize>,
    _global: OwnedSemaphorePermit,
    _host: OwnedSemaphorePermit,
}

impl HostPermit {
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for HostPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tokio::task::JoinSet;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_acquire__basic() {
        let limiter = HostLimiter::new(2, 2);
        let first = limiter.acquire("a.com").await.unwrap();
        let second = limiter.acquire("b.com").await.unwrap();

        assert_eq!(limiter.in_flight(), 2);
        assert_eq!(limiter.available_global(), 0);
        assert_eq!(first.host(), "a.com");

        limiter.release(first);
        drop(second);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available_global(), 2);
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_acquire__wait_exceeded() {
        let limiter = HostLimiter::new(4, 1).with_wait_limit(Duration::from_millis(50));
        let _held = limiter.acquire("busy.com").await.unwrap();

        let result = limiter.acquire("busy.com").await;
        assert_eq!(
            result.unwrap_err(),
            AcquireError::WaitExceeded(Duration::from_millis(50))
        );

        // Other hosts are unaffected
        assert!(limiter.acquire("idle.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_acquire__timed_out_waiter_holds_nothing() {
        let limiter = HostLimiter::new(1, 1).with_wait_limit(Duration::from_millis(20));
        let held = limiter.acquire("a.com").await.unwrap();
        assert!(limiter.acquire("b.com").await.is_err());

        drop(held);
        assert_eq!(limiter.available_global(), 1);
        assert!(limiter.acquire("b.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_acquire__respects_bounds_under_load() {
        let limiter = Arc::new(HostLimiter::new(6, 2));
        let per_host_peak = Arc::new(DashMap::<String, usize>::new());
        let per_host_now = Arc::new(DashMap::<String, AtomicUsize>::new());

        let mut tasks = JoinSet::new();
        for i in 0..60 {
            let limiter = Arc::clone(&limiter);
            let per_host_peak = Arc::clone(&per_host_peak);
            let per_host_now = Arc::clone(&per_host_now);
            let host = format!("host{}.com", i % 5);
            tasks.spawn(async move {
                let _permit = limiter.acquire(&host).await.unwrap();
                let now = per_host_now
                    .entry(host.clone())
                    .or_insert_with(|| AtomicUsize::new(0))
                    .fetch_add(1, Ordering::SeqCst)
                    + 1;
                per_host_peak
                    .entry(host.clone())
                    .and_modify(|peak| *peak = (*peak).max(now))
                    .or_insert(now);
                sleep(Duration::from_millis(5)).await;
                if let Some(counter) = per_host_now.get(&host) {
                    counter.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert!(limiter.peak_in_flight() <= 6);
        for entry in per_host_peak.iter() {
            assert!(*entry.value() <= 2, "{} exceeded per-host bound", entry.key());
        }
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_acquire__busy_host_does_not_starve_others() {
        let limiter = Arc::new(HostLimiter::new(2, 1));
        let _busy = limiter.acquire("busy.com").await.unwrap();

        // Queue many waiters for the busy host
        let mut waiters = JoinSet::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            waiters.spawn(async move {
                let _permit = limiter.acquire("busy.com").await;
                sleep(Duration::from_millis(1)).await;
            });
        }
        tokio::task::yield_now().await;

        // A different host still gets the second global slot right away
        let quick = timeout(Duration::from_millis(200), limiter.acquire("quiet.com")).await;
        assert!(matches!(quick, Ok(Ok(_))));
        waiters.abort_all();
    }

    #[tokio::test]
    async fn test_cool_down__delays_new_acquisitions() {
        let limiter = HostLimiter::new(4, 4);
        limiter.cool_down("slow.com", Duration::from_millis(80));
        assert!(limiter.cooldown_remaining("slow.com").is_some());

        let start = Instant::now();
        let _permit = limiter.acquire("slow.com").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(70));

        // Other hosts are not held back
        let start = Instant::now();
        let _other = limiter.acquire("fast.com").await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cool_down__keeps_later_deadline() {
        let limiter = HostLimiter::new(1, 1);
        limiter.cool_down("a.com", Duration::from_secs(10));
        limiter.cool_down("a.com", Duration::from_millis(1));
        assert!(limiter.cooldown_remaining("a.com").unwrap() > Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_close__wakes_waiters() {
        let limiter = Arc::new(HostLimiter::new(1, 1));
        let held = limiter.acquire("a.com").await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire("a.com").await })
        };
        tokio::task::yield_now().await;
        limiter.close();

        assert_eq!(waiter.await.unwrap().unwrap_err(), AcquireError::Closed);
        drop(held);
    }
}
