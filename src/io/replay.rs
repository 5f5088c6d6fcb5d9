//! JSONL event replay
//!
//! Reads recorded events (one JSON object per line) and feeds them into an
//! event log, either all at once or paced by the recorded timestamp gaps.

use crate::domain::event::Event;
use crate::domain::event_log::EventLog;
use anyhow::Context;
use std::path::Path;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Parse JSONL content, skipping blank and malformed lines
pub fn parse_jsonl(content: &str) -> Vec<Event> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<Event>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(line = %(i + 1), error = %e, "replay_line_skipped");
                None
            }
        })
        .collect()
}

pub fn load_events<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Event>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;
    let events = parse_jsonl(&content);
    info!(path = %path.display(), events = %events.len(), "replay_loaded");
    Ok(events)
}

/// Delay before appending `next`, from the recorded gap, capped at `max_gap`
pub fn pacing_delay(prev: &Event, next: &Event, max_gap: Duration) -> Duration {
    let gap_ms = next.timestamp.saturating_sub(prev.timestamp).max(0) as u64;
    Duration::from_millis(gap_ms).min(max_gap)
}

/// Append `events` to `log`. With `max_gap` set, appends one at a time
/// honouring the recorded gaps; otherwise appends everything at once.
/// Returns how many events were appended before finishing or shutdown.
pub async fn replay(
    events: Vec<Event>,
    log: &EventLog,
    max_gap: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let Some(max_gap) = max_gap else {
        let count = events.len();
        log.extend(events);
        info!(count = %count, "replay_finished");
        return count;
    };

    let mut appended = 0;
    let mut prev: Option<Event> = None;
    for event in events {
        if let Some(prev) = &prev {
            let delay = pacing_delay(prev, &event, max_gap);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        prev = Some(event.clone());
        log.append(event);
        appended += 1;
    }

    info!(count = %appended, "replay_finished");
    appended
}
