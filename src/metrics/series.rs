//! Time-windowed sample series.
//!
//! Each metric instance owns one series: a map of whole-second timestamps
//! to values plus an insertion-order index used for retention eviction.
//! All mutation goes through one per-series mutex, so record/trim/snapshot
//! are mutually exclusive on a single series and fully independent across
//! series.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Ordered collection of (timestamp, value) samples with retention
/// enforcement.
#[derive(Debug)]
pub struct TimeWindowedSeries {
    retention: Duration,
    inner: Mutex<SeriesInner>,
}

#[derive(Debug, Default)]
struct SeriesInner {
    /// Timestamp -> value; last write for a timestamp wins.
    samples: HashMap<i64, f64>,
    /// Timestamps in append order. May hold duplicates and already-evicted
    /// entries between trims; `trim` compacts it back to exactly the
    /// surviving timestamps.
    order: Vec<i64>,
}

impl TimeWindowedSeries {
    /// Create an empty series with the given retention window.
    pub fn new(retention: Duration) -> Self {
        TimeWindowedSeries {
            retention,
            inner: Mutex::new(SeriesInner::default()),
        }
    }

    /// The retention window samples are kept for.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Insert or overwrite the sample at `timestamp`.
    ///
    /// Values are stored verbatim, NaN and infinities included. Retention
    /// is not enforced here; callers run `trim` separately so writes can
    /// be batched ahead of a single trim pass.
    pub fn record(&self, timestamp: i64, value: f64) {
        let mut inner = self.inner.lock();
        inner.samples.insert(timestamp, value);
        inner.order.push(timestamp);
    }

    /// Evict every sample older than the retention window.
    ///
    /// Boundary policy: keep samples with `timestamp > now - retention`; a
    /// sample exactly `retention` old is evicted. The order index is
    /// compacted to the surviving timestamps, first occurrence each,
    /// preserving relative order. Runs under the series lock, so a
    /// concurrent `snapshot` never observes samples and order out of step.
    pub fn trim(&self, now: i64) {
        let cutoff = now.saturating_sub(self.retention.as_secs() as i64);
        let mut inner = self.inner.lock();

        inner.samples.retain(|ts, _| *ts > cutoff);

        let mut seen = HashSet::with_capacity(inner.samples.len());
        let survivors: Vec<i64> = inner
            .order
            .iter()
            .copied()
            .filter(|ts| inner.samples.contains_key(ts) && seen.insert(*ts))
            .collect();
        inner.order = survivors;
    }

    /// Point-in-time copy of the samples, safe to iterate without holding
    /// the series lock.
    pub fn snapshot(&self) -> HashMap<i64, f64> {
        self.inner.lock().samples.clone()
    }

    /// Timestamps in insertion order as of now. Between a record and the
    /// next trim this may include duplicates.
    pub fn order(&self) -> Vec<i64> {
        self.inner.lock().order.clone()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }
}
