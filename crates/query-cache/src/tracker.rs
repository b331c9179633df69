//! Instrumentation hooks wrapped around producer execution

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Hook wrapped around a producer when it actually runs.
///
/// Whatever `track` returns is what the cache stores and hands back to the
/// caller, so an implementation must pass the producer's output through.
#[async_trait]
pub trait QueryTracker: Send + Sync {
    async fn track<T, E, F>(&self, label: &str, query: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send;
}

/// Timing accumulated for one query label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryTiming {
    pub calls: u64,
    pub failures: u64,
    pub total: Duration,
    pub max: Duration,
}

impl QueryTiming {
    /// Mean duration per call
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        match u32::try_from(self.calls) {
            Ok(calls) => self.total / calls,
            Err(_) => self.total.div_f64(self.calls as f64),
        }
    }
}

/// Records per-label latency and warns about slow queries
#[derive(Debug)]
pub struct LatencyTracker {
    slow_threshold: Duration,
    timings: Mutex<BTreeMap<String, QueryTiming>>,
}

impl LatencyTracker {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            timings: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one execution
    pub fn record(&self, label: &str, elapsed: Duration, failed: bool) {
        let mut timings = self.timings.lock();
        let timing = timings.entry(label.to_string()).or_default();
        timing.calls += 1;
        timing.total += elapsed;
        timing.max = timing.max.max(elapsed);
        if failed {
            timing.failures += 1;
        }
    }

    /// Timing for one label
    pub fn timing(&self, label: &str) -> Option<QueryTiming> {
        self.timings.lock().get(label).cloned()
    }

    /// Snapshot of all timings, keyed by label
    pub fn report(&self) -> BTreeMap<String, QueryTiming> {
        self.timings.lock().clone()
    }

    /// Labels whose slowest call reached the threshold
    pub fn slow_queries(&self) -> Vec<String> {
        self.timings
            .lock()
            .iter()
            .filter(|(_, timing)| timing.max >= self.slow_threshold)
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.timings.lock().clear();
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl QueryTracker for LatencyTracker {
    async fn track<T, E, F>(&self, label: &str, query: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        let started = Instant::now();
        let result = query.await;
        let elapsed = started.elapsed();

        self.record(label, elapsed, result.is_err());
        if elapsed >= self.slow_threshold {
            warn!("Slow query '{}' took {:?}", label, elapsed);
        } else {
            debug!("Query '{}' took {:?}", label, elapsed);
        }
        result
    }
}
