//! Shared session clock: time-on-page counter and cached "now"
//!
//! One clock per session, any number of observers. Two independent
//! intervals drive it: a 1 s counter tick and a slower refresh of the
//! `now` snapshot used for relative timestamps, so relative strings only
//! change when `now` is refreshed. Both keep running while the feed is
//! hidden; they stop together on shutdown.

use crate::domain::event::epoch_ms;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Wall-clock source, injectable for tests
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_ms(&self) -> i64 {
        epoch_ms()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Seconds since the feed was mounted
    pub time_spent_secs: u64,
    /// Cached epoch ms, refreshed on its own interval
    pub now_ms: i64,
}

pub struct SessionClock {
    snapshot: ClockSnapshot,
    tx: watch::Sender<ClockSnapshot>,
    source: Arc<dyn TimeSource>,
    tick_period: Duration,
    refresh_period: Duration,
}

impl SessionClock {
    pub fn new(source: Arc<dyn TimeSource>, tick_period: Duration, refresh_period: Duration) -> Self {
        let snapshot = ClockSnapshot { time_spent_secs: 0, now_ms: source.now_ms() };
        let (tx, _) = watch::channel(snapshot);
        Self { snapshot, tx, source, tick_period, refresh_period }
    }

    pub fn system(tick_period: Duration, refresh_period: Duration) -> Self {
        Self::new(Arc::new(SystemClock), tick_period, refresh_period)
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.snapshot
    }

    pub fn subscribe(&self) -> watch::Receiver<ClockSnapshot> {
        self.tx.subscribe()
    }

    /// Advance the time-on-page counter by one second
    pub fn tick_second(&mut self) {
        self.snapshot.time_spent_secs += 1;
        self.tx.send_replace(self.snapshot);
    }

    /// Re-read the wall clock into the cached `now`
    pub fn refresh_now(&mut self) {
        self.snapshot.now_ms = self.source.now_ms();
        self.tx.send_replace(self.snapshot);
        debug!(now_ms = %self.snapshot.now_ms, "clock_now_refreshed");
    }

    /// Drive both intervals until shutdown is signalled
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let start = Instant::now();
        let mut tick = interval_at(start + self.tick_period, self.tick_period);
        let mut refresh = interval_at(start + self.refresh_period, self.refresh_period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_ms = %self.tick_period.as_millis(),
            refresh_ms = %self.refresh_period.as_millis(),
            "session_clock_started"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => self.tick_second(),
                _ = refresh.tick() => self.refresh_now(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(time_spent_secs = %self.snapshot.time_spent_secs, "session_clock_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock(AtomicI64);

    impl TimeSource for FixedClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn fixed(ms: i64) -> Arc<FixedClock> {
        Arc::new(FixedClock(AtomicI64::new(ms)))
    }

    #[test]
    fn test_tick_and_refresh_are_independent() {
        let source = fixed(1_000);
        let mut clock =
            SessionClock::new(source.clone(), Duration::from_secs(1), Duration::from_secs(5));
        let rx = clock.subscribe();

        source.0.store(9_000, Ordering::Relaxed);
        clock.tick_second();
        clock.tick_second();
        // Counter moved, cached now did not
        assert_eq!(*rx.borrow(), ClockSnapshot { time_spent_secs: 2, now_ms: 1_000 });

        clock.refresh_now();
        assert_eq!(rx.borrow().now_ms, 9_000);
        assert_eq!(rx.borrow().time_spent_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drives_both_intervals() {
        let source = fixed(0);
        let clock =
            SessionClock::new(source.clone(), Duration::from_secs(1), Duration::from_secs(5));
        let rx = clock.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(clock.run(shutdown_rx));

        source.0.store(42_000, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(rx.borrow().time_spent_secs, 4);
        assert_eq!(rx.borrow().now_ms, 0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(rx.borrow().time_spent_secs, 5);
        assert_eq!(rx.borrow().now_ms, 42_000);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
