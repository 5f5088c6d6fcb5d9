//! Bounded display window over the event log and new-event detection
//!
//! The window is a pure projection: it borrows the log and never reorders
//! or drops source entries. New-event flags come from a watermark (count
//! of events seen by the previous render). The watermark is only advanced
//! when a `RenderPass` ends, after every flag of that pass has been read;
//! the pass holds `&mut Watermark`, so nothing else can touch it meanwhile.

use crate::domain::event::Event;
use serde::Deserialize;

/// Display order of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOrder {
    /// Reverse chronological, latest event at index 0
    #[default]
    NewestFirst,
    /// Chronological within the visible slice
    OldestFirst,
}

impl WindowOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowOrder::NewestFirst => "newest_first",
            WindowOrder::OldestFirst => "oldest_first",
        }
    }
}

/// Stable render key: the event id, else the absolute log position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderKey {
    Id(String),
    Position(usize),
}

impl std::fmt::Display for RenderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderKey::Id(id) => f.write_str(id),
            RenderKey::Position(pos) => write!(f, "#{pos}"),
        }
    }
}

/// One windowed event
#[derive(Debug, Clone, Copy)]
pub struct WindowEntry<'a> {
    /// Position in the full log
    pub log_index: usize,
    pub event: &'a Event,
}

impl WindowEntry<'_> {
    pub fn key(&self) -> RenderKey {
        match self.event.event_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => RenderKey::Id(id.to_string()),
            None => RenderKey::Position(self.log_index),
        }
    }
}

/// The last `capacity` events of `events`, in `order`
pub fn window(events: &[Event], capacity: usize, order: WindowOrder) -> Vec<WindowEntry<'_>> {
    let start = events.len().saturating_sub(capacity);
    let slice = events[start..]
        .iter()
        .enumerate()
        .map(|(offset, event)| WindowEntry { log_index: start + offset, event });

    match order {
        WindowOrder::NewestFirst => slice.rev().collect(),
        WindowOrder::OldestFirst => slice.collect(),
    }
}

/// Count of events seen as of the last completed render
#[derive(Debug, Clone, Default)]
pub struct Watermark {
    seen: usize,
    rendered_once: bool,
    highlight_initial: bool,
}

impl Watermark {
    /// `highlight_initial = false` suppresses the flash of highlights on
    /// the very first render
    pub fn new(highlight_initial: bool) -> Self {
        Self { seen: 0, rendered_once: false, highlight_initial }
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Start a render over a log of `total` events
    pub fn begin_pass(&mut self, total: usize) -> RenderPass<'_> {
        let fresh = if !self.rendered_once && !self.highlight_initial {
            0
        } else {
            total.saturating_sub(self.seen)
        };
        RenderPass { watermark: self, total, fresh }
    }
}

/// A single render over one log generation. Dropping it commits the
/// observed total to the watermark.
#[derive(Debug)]
pub struct RenderPass<'w> {
    watermark: &'w mut Watermark,
    total: usize,
    fresh: usize,
}

impl RenderPass<'_> {
    /// Events appended since the previous render
    pub fn fresh_count(&self) -> usize {
        self.fresh
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether the entry at `display_index` of a window of `window_len`
    /// entries arrived since the previous render
    pub fn is_new(&self, display_index: usize, window_len: usize, order: WindowOrder) -> bool {
        match order {
            WindowOrder::NewestFirst => display_index < self.fresh,
            WindowOrder::OldestFirst => display_index >= window_len.saturating_sub(self.fresh),
        }
    }

    /// End the pass and advance the watermark
    pub fn finish(self) {}
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        self.watermark.seen = self.total;
        self.watermark.rendered_once = true;
    }
}
