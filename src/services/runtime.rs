//! Feed runtime - async event loop around one `FeedEngine`
//!
//! Wakes on log changes, clock updates, user actions and animation frames,
//! and hands every fresh view to a `FeedSink`. Only a new log generation
//! re-projects; clock and action wakeups reuse the engine's cached rows.
//! The frame schedule exists only while the ticker is running on a sink
//! that animates; it is created on `Started` and dropped on `Stopped`, so
//! at most one schedule is ever pending.

use crate::domain::event_log::EventLog;
use crate::infra::metrics::FeedMetrics;
use crate::services::clock::ClockSnapshot;
use crate::services::feed::{Action, FeedEngine, FeedView, Refresh};
use crate::services::ticker::{FrameOutcome, Measure, Transition};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Rendering surface driven by the runtime
pub trait FeedSink: Measure + Send {
    /// A recomputed view is ready
    fn present(&mut self, view: &FeedView);

    /// The ticker moved without a recompute
    fn scroll(&mut self, _offset: f64) {}

    /// Whether the surface shows the ticker; no frames are scheduled otherwise
    fn animates(&self) -> bool {
        true
    }
}

pub struct FeedRuntime {
    engine: FeedEngine,
    log: Arc<EventLog>,
    clock_rx: watch::Receiver<ClockSnapshot>,
    actions: mpsc::Receiver<Action>,
    frame_period: Duration,
    metrics: Option<Arc<FeedMetrics>>,
    animate: bool,
}

async fn next_frame(frames: &mut Option<Interval>) -> Instant {
    match frames {
        Some(schedule) => schedule.tick().await,
        None => std::future::pending().await,
    }
}

impl FeedRuntime {
    pub fn new(
        engine: FeedEngine,
        log: Arc<EventLog>,
        clock_rx: watch::Receiver<ClockSnapshot>,
        actions: mpsc::Receiver<Action>,
        frame_period: Duration,
    ) -> Self {
        Self { engine, log, clock_rx, actions, frame_period, metrics: None, animate: true }
    }

    pub fn with_metrics(mut self, metrics: Arc<FeedMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn schedule(&self, transition: Transition, frames: &mut Option<Interval>) {
        match transition {
            Transition::Started if !self.animate => {
                debug!("frame_schedule_skipped");
            }
            Transition::Started => {
                let mut schedule = interval(self.frame_period);
                schedule.set_missed_tick_behavior(MissedTickBehavior::Skip);
                *frames = Some(schedule);
                debug!(frame_ms = %self.frame_period.as_millis(), "frame_schedule_started");
            }
            Transition::Stopped => {
                *frames = None;
                debug!("frame_schedule_cancelled");
            }
            Transition::Unchanged => {}
        }
    }

    fn present<S: FeedSink>(&mut self, sink: &mut S) {
        let started = std::time::Instant::now();
        let snapshot = self.log.snapshot();
        let view = self.engine.render(&snapshot);
        if let (Some(metrics), Refresh::Projected) = (&self.metrics, view.refresh) {
            metrics.record_render(started.elapsed().as_micros() as u64);
        }
        if view.fresh_count > 0 {
            debug!(fresh = %view.fresh_count, total = %snapshot.len(), "feed_new_events");
        }
        sink.present(&view);
    }

    /// Run until shutdown, then tear down and hand the engine back
    pub async fn run<S: FeedSink>(
        mut self,
        sink: &mut S,
        mut shutdown: watch::Receiver<bool>,
    ) -> FeedEngine {
        let mut log_rx = self.log.subscribe();
        let mut frames: Option<Interval> = None;
        let start = Instant::now();
        self.animate = sink.animates();

        self.engine.set_clock(*self.clock_rx.borrow_and_update());
        let transition = self.engine.mount();
        self.schedule(transition, &mut frames);
        self.present(sink);

        info!(session = %self.log.session_id().0, animate = %self.animate, "feed_runtime_started");

        loop {
            tokio::select! {
                Ok(()) = log_rx.changed() => {
                    if self.engine.should_recompute(&self.log.snapshot()) {
                        self.present(sink);
                    }
                }
                Ok(()) = self.clock_rx.changed() => {
                    let clock = *self.clock_rx.borrow_and_update();
                    self.engine.set_clock(clock);
                    self.present(sink);
                }
                Some(action) = self.actions.recv() => {
                    let transition = self.engine.apply(action);
                    self.schedule(transition, &mut frames);
                    self.present(sink);
                }
                tick = next_frame(&mut frames) => {
                    let timestamp_ms = (tick - start).as_secs_f64() * 1000.0;
                    let outcome = self.engine.frame(timestamp_ms, &*sink);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_frame();
                    }
                    if let FrameOutcome::Moved { offset } | FrameOutcome::Wrapped { offset } = outcome {
                        sink.scroll(offset);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Ticker, frame schedule and subscriptions go down together
        self.engine.teardown();
        drop(frames);
        info!("feed_runtime_stopped");
        self.engine
    }
}
