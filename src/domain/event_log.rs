//! Append-only event log shared between the tracking side and the feed
//!
//! Writers append; readers take cheap snapshots. Every append swaps in a
//! new `Arc`, so a reader can tell the log changed by comparing snapshot
//! identity instead of diffing contents. Subscribers are woken through a
//! watch channel carrying the current total.

use crate::domain::event::{Event, SessionId};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Immutable view of the log at one point in time
#[derive(Debug, Clone)]
pub struct LogSnapshot {
    events: Arc<Vec<Event>>,
}

impl LogSnapshot {
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events: Arc::new(events) }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when both snapshots are the same log generation
    pub fn same_generation(&self, other: &LogSnapshot) -> bool {
        Arc::ptr_eq(&self.events, &other.events)
    }
}

impl Default for LogSnapshot {
    fn default() -> Self {
        Self::from_events(Vec::new())
    }
}

/// Live, append-only event log for one browsing session
pub struct EventLog {
    session_id: SessionId,
    current: RwLock<Arc<Vec<Event>>>,
    total_tx: watch::Sender<usize>,
}

impl EventLog {
    pub fn new(session_id: SessionId) -> Self {
        let (total_tx, _) = watch::channel(0);
        Self { session_id, current: RwLock::new(Arc::new(Vec::new())), total_tx }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Append one event, returning the new total
    pub fn append(&self, event: Event) -> usize {
        self.extend(std::iter::once(event))
    }

    /// Append events in arrival order, returning the new total
    pub fn extend<I: IntoIterator<Item = Event>>(&self, events: I) -> usize {
        let incoming: Vec<Event> = events.into_iter().collect();
        let total = {
            let mut current = self.current.write();
            if incoming.is_empty() {
                return current.len();
            }
            // Reuse the buffer when no reader holds the old generation
            let old = std::mem::take(&mut *current);
            let mut next = Arc::try_unwrap(old).unwrap_or_else(|shared| shared.as_ref().clone());
            next.extend(incoming);
            *current = Arc::new(next);
            // Published under the lock so totals never go backwards
            self.total_tx.send_replace(current.len());
            current.len()
        };

        debug!(total = %total, "event_log_appended");
        total
    }

    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot { events: self.current.read().clone() }
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver woken on every append; the value is the total after it
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.total_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventType;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn log() -> EventLog {
        EventLog::new(SessionId("session-1234567890".to_string()))
    }

    #[test]
    fn test_append_keeps_order() {
        let log = log();
        log.append(Event::new(EventType::Pageview, 1));
        log.append(Event::new(EventType::Click, 2));
        let total = log.extend(vec![
            Event::new(EventType::FormSubmit, 3),
            Event::new(EventType::HeatmapClick, 4),
        ]);

        assert_eq!(total, 4);
        let snapshot = log.snapshot();
        let stamps: Vec<i64> = snapshot.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_identity_changes_on_append() {
        let log = log();
        log.append(Event::new(EventType::Pageview, 1));

        let a = log.snapshot();
        let b = log.snapshot();
        assert!(a.same_generation(&b));

        log.append(Event::new(EventType::Click, 2));
        let c = log.snapshot();
        assert!(!a.same_generation(&c));
        // Earlier snapshots are never mutated
        assert_eq!(a.len(), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_empty_extend_is_not_a_change() {
        let log = log();
        let before = log.snapshot();
        assert_eq!(log.extend(Vec::new()), 0);
        assert!(before.same_generation(&log.snapshot()));
    }

    #[tokio::test]
    async fn test_subscribers_see_totals() {
        let log = log();
        let mut rx = log.subscribe();

        log.append(Event::new(EventType::Click, 1));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        log.extend(vec![Event::new(EventType::Click, 2), Event::new(EventType::Click, 3)]);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 3);
    }

    #[test]
    fn test_concurrent_appends_publish_increasing_totals() {
        let log = Arc::new(log());
        let rx = log.subscribe();
        let done = Arc::new(AtomicBool::new(false));

        let watcher = {
            let rx = rx.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut seen = 0;
                while !done.load(Ordering::Acquire) {
                    let total = *rx.borrow();
                    assert!(total >= seen, "total went from {seen} to {total}");
                    seen = total;
                }
            })
        };

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        log.extend(vec![Event::new(EventType::Click, w * 1000 + i)]);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        watcher.join().unwrap();

        assert_eq!(log.len(), 1600);
        assert_eq!(*rx.borrow(), 1600);
    }
}
