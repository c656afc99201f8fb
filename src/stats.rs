//! Process-wide counters and latency histograms.
//!
//! Recording is lock-free (atomic adds) and never gates protocol
//! correctness; readers may observe a histogram mid-update, but every
//! single counter is consistent.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

/// The operations for which latencies are recorded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Metric {
    Read,
    Write,
    Auth,
    Prepare,
    Execute,
    Query,
    Call,
    Fetch,
    FetchLob,
    Commit,
    Rollback,
}

const METRIC_COUNT: usize = 11;

/// Default histogram bucket bounds.
pub const DEFAULT_BUCKET_BOUNDS: [Duration; 9] = [
    Duration::from_micros(100),
    Duration::from_micros(300),
    Duration::from_millis(1),
    Duration::from_millis(3),
    Duration::from_millis(10),
    Duration::from_millis(30),
    Duration::from_millis(100),
    Duration::from_millis(300),
    Duration::from_secs(1),
];

/// A latency histogram with configurable bucket bounds. Each recorded
/// duration increments the first bucket whose bound is not exceeded (or
/// the overflow bucket), plus count and sum.
#[derive(Debug)]
pub struct Histogram {
    bounds: Vec<Duration>,
    buckets: Vec<AtomicU64>, // bounds.len() + 1, the last is the overflow
    count: AtomicU64,
    sum_micros: AtomicU64,
}

impl Histogram {
    fn new(bounds: &[Duration]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            buckets: (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
        }
    }

    fn record(&self, duration: Duration) {
        let index = self
            .bounds
            .iter()
            .position(|bound| duration <= *bound)
            .unwrap_or(self.bounds.len());
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)]
        self.sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Number of recorded durations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of the recorded durations in microseconds.
    #[must_use]
    pub fn sum_micros(&self) -> u64 {
        self.sum_micros.load(Ordering::Relaxed)
    }

    /// The bucket bounds.
    #[must_use]
    pub fn bounds(&self) -> &[Duration] {
        &self.bounds
    }

    /// Bucket counts; one more entry than bounds (the overflow bucket).
    #[must_use]
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect()
    }
}

/// Counters and latency histograms of this process's connections.
#[derive(Debug)]
pub struct Statistics {
    open_connections: AtomicI64,
    open_transactions: AtomicI64,
    open_statements: AtomicI64,
    open_cursors: AtomicI64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    histograms: Vec<Histogram>, // indexed by Metric
}

impl Statistics {
    fn new(bounds: &[Duration]) -> Self {
        Self {
            open_connections: AtomicI64::new(0),
            open_transactions: AtomicI64::new(0),
            open_statements: AtomicI64::new(0),
            open_cursors: AtomicI64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            histograms: (0..METRIC_COUNT).map(|_| Histogram::new(bounds)).collect(),
        }
    }

    /// The process-wide statistics instance.
    ///
    /// The bucket bounds are fixed on first access; use
    /// [`initialize_with_bounds`](Statistics::initialize_with_bounds)
    /// before opening the first connection to customize them.
    pub fn global() -> &'static Statistics {
        INSTANCE.get_or_init(|| Statistics::new(&DEFAULT_BUCKET_BOUNDS))
    }

    /// Installs custom histogram bucket bounds. Only effective if called
    /// before the instance was first used; returns false otherwise.
    pub fn initialize_with_bounds(bounds: &[Duration]) -> bool {
        INSTANCE.set(Statistics::new(bounds)).is_ok()
    }

    /// Currently open connections.
    #[must_use]
    pub fn open_connections(&self) -> i64 {
        self.open_connections.load(Ordering::Relaxed)
    }

    /// Currently open transactions.
    #[must_use]
    pub fn open_transactions(&self) -> i64 {
        self.open_transactions.load(Ordering::Relaxed)
    }

    /// Currently open prepared statements.
    #[must_use]
    pub fn open_statements(&self) -> i64 {
        self.open_statements.load(Ordering::Relaxed)
    }

    /// Currently open cursors.
    #[must_use]
    pub fn open_cursors(&self) -> i64 {
        self.open_cursors.load(Ordering::Relaxed)
    }

    /// Bytes read from the network so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Bytes written to the network so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// The latency histogram of the given operation.
    #[must_use]
    pub fn histogram(&self, metric: Metric) -> &Histogram {
        &self.histograms[metric as usize]
    }

    pub(crate) fn record(&self, metric: Metric, duration: Duration) {
        self.histograms[metric as usize].record(duration);
    }

    pub(crate) fn add_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn change_open_connections(&self, delta: i64) {
        self.open_connections.fetch_add(delta, Ordering::Relaxed);
    }

    pub(crate) fn change_open_transactions(&self, delta: i64) {
        self.open_transactions.fetch_add(delta, Ordering::Relaxed);
    }

    pub(crate) fn change_open_statements(&self, delta: i64) {
        self.open_statements.fetch_add(delta, Ordering::Relaxed);
    }

    pub(crate) fn change_open_cursors(&self, delta: i64) {
        self.open_cursors.fetch_add(delta, Ordering::Relaxed);
    }
}

static INSTANCE: OnceLock<Statistics> = OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_buckets_count_and_overflow() {
        let histogram = Histogram::new(&[Duration::from_millis(1), Duration::from_millis(10)]);
        histogram.record(Duration::from_micros(500));
        histogram.record(Duration::from_millis(5));
        histogram.record(Duration::from_millis(5));
        histogram.record(Duration::from_secs(2));
        assert_eq!(histogram.bucket_counts(), vec![1, 2, 1]);
        assert_eq!(histogram.count(), 4);
        assert!(histogram.sum_micros() >= 2_010_500);
    }

    #[test]
    fn gauges_move_both_ways() {
        let stats = Statistics::new(&DEFAULT_BUCKET_BOUNDS);
        stats.change_open_connections(1);
        stats.change_open_connections(1);
        stats.change_open_connections(-1);
        assert_eq!(stats.open_connections(), 1);
        stats.add_bytes_read(42);
        assert_eq!(stats.bytes_read(), 42);
    }
}
