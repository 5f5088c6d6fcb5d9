//! Lock-free feed metrics and periodic reporting
//!
//! Counters are atomics updated from the collector and the feed runtime;
//! `report()` swaps the per-interval counters to produce a snapshot.
//!
//! All atomics use Relaxed ordering: these are statistical counters only
//! and must not be used for coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Render latency bucket boundaries (microseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, >6400
const RENDER_BUCKET_BOUNDS: [u64; 8] = [50, 100, 200, 400, 800, 1600, 3200, 6400];
const NUM_BUCKETS: usize = 9;

/// Compute bucket index for a render latency using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    RENDER_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile).ceil() as u64;
    let mut cumulative = 0u64;

    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] = [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector for the feed
pub struct FeedMetrics {
    /// Events accepted by the collector (monotonic)
    events_received: AtomicU64,
    /// Events accepted since last report (reset on report)
    events_since_report: AtomicU64,
    /// Collector requests carrying at least one event (monotonic)
    batches_received: AtomicU64,
    /// Collector requests rejected as malformed (monotonic)
    requests_rejected: AtomicU64,
    /// Feed projections computed (monotonic)
    renders_total: AtomicU64,
    /// Render latency histogram (reset on report)
    render_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of render latencies (reset on report)
    render_sum_us: AtomicU64,
    /// Max render latency (reset on report)
    render_max_us: AtomicU64,
    /// Renders since last report (reset on report)
    renders_since_report: AtomicU64,
    /// Ticker frames since last report (reset on report)
    frames_since_report: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            batches_received: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            renders_total: AtomicU64::new(0),
            render_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            render_sum_us: AtomicU64::new(0),
            render_max_us: AtomicU64::new(0),
            renders_since_report: AtomicU64::new(0),
            frames_since_report: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a collector batch of `count` events
    #[inline]
    pub fn record_batch(&self, count: usize) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.events_received.fetch_add(count as u64, Ordering::Relaxed);
        self.events_since_report.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one feed projection and how long it took
    #[inline]
    pub fn record_render(&self, latency_us: u64) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        self.renders_since_report.fetch_add(1, Ordering::Relaxed);
        self.render_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.render_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.render_max_us, latency_us);
    }

    #[inline]
    pub fn record_frame(&self) {
        self.frames_since_report.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn requests_rejected(&self) -> u64 {
        self.requests_rejected.load(Ordering::Relaxed)
    }

    pub fn renders_total(&self) -> u64 {
        self.renders_total.load(Ordering::Relaxed)
    }

    /// Snapshot and reset the per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };

        let events = self.events_since_report.swap(0, Ordering::Relaxed);
        let frames = self.frames_since_report.swap(0, Ordering::Relaxed);
        let renders = self.renders_since_report.swap(0, Ordering::Relaxed);
        let render_sum = self.render_sum_us.swap(0, Ordering::Relaxed);
        let render_max_us = self.render_max_us.swap(0, Ordering::Relaxed);
        let buckets = swap_buckets(&self.render_buckets);

        let per_sec = |count: u64| if elapsed_secs > 0.0 { count as f64 / elapsed_secs } else { 0.0 };

        MetricsSummary {
            events_received: self.events_received(),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected(),
            renders_total: self.renders_total(),
            events_per_sec: per_sec(events),
            frames_per_sec: per_sec(frames),
            render_avg_us: if renders > 0 { render_sum / renders } else { 0 },
            render_max_us,
            render_p99_us: percentile_from_buckets(&buckets, 0.99),
        }
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub events_received: u64,
    pub batches_received: u64,
    pub requests_rejected: u64,
    pub renders_total: u64,
    pub events_per_sec: f64,
    pub frames_per_sec: f64,
    pub render_avg_us: u64,
    pub render_max_us: u64,
    pub render_p99_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            events_received = %self.events_received,
            batches = %self.batches_received,
            rejected = %self.requests_rejected,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            renders = %self.renders_total,
            render_avg_us = %self.render_avg_us,
            render_max_us = %self.render_max_us,
            render_p99_us = %self.render_p99_us,
            fps = format!("{:.1}", self.frames_per_sec),
            "metrics"
        );
    }
}
