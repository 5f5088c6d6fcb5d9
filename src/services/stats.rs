//! Per-type counters over the full event log

use crate::domain::event::{Event, EventType};
use rustc_hash::FxHashMap;

/// Counts over the whole log, independent of the display window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStats {
    pub counts_by_type: FxHashMap<EventType, usize>,
    pub total: usize,
}

impl FeedStats {
    pub fn count(&self, event_type: &EventType) -> usize {
        self.counts_by_type.get(event_type).copied().unwrap_or(0)
    }

    pub fn clicks(&self) -> usize {
        self.count(&EventType::Click)
    }

    pub fn pageviews(&self) -> usize {
        self.count(&EventType::Pageview)
    }

    pub fn form_submits(&self) -> usize {
        self.count(&EventType::FormSubmit)
    }

    pub fn heatmap_clicks(&self) -> usize {
        self.count(&EventType::HeatmapClick)
    }

    /// Types ordered by descending count, then by tag
    pub fn ranked(&self) -> Vec<(&EventType, usize)> {
        let mut ranked: Vec<_> = self.counts_by_type.iter().map(|(t, &n)| (t, n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        ranked
    }
}

/// Single pass over `events`. Duplicate event ids are counted as-is.
pub fn aggregate(events: &[Event]) -> FeedStats {
    let mut counts_by_type: FxHashMap<EventType, usize> = FxHashMap::default();
    for event in events {
        *counts_by_type.entry(event.event_type.clone()).or_insert(0) += 1;
    }
    FeedStats { counts_by_type, total: events.len() }
}
