//! Event type to display class lookup

use crate::domain::event::EventType;

/// Icon, style class and counter label for an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClass {
    pub icon: &'static str,
    pub style_class: &'static str,
    pub label: &'static str,
}

pub const PAGEVIEW: EventClass =
    EventClass { icon: "🔍", style_class: "event-pageview", label: "Page views" };
pub const CLICK: EventClass = EventClass { icon: "👆", style_class: "event-click", label: "Clicks" };
pub const FORM_SUBMIT: EventClass =
    EventClass { icon: "📝", style_class: "event-form", label: "Form submits" };
pub const HEATMAP_CLICK: EventClass =
    EventClass { icon: "🔥", style_class: "event-heatmap", label: "Heat map clicks" };
pub const CUSTOM: EventClass =
    EventClass { icon: "🔔", style_class: "event-custom", label: "Custom" };

/// Classify an event type. Total: unknown tags map to `CUSTOM`.
#[inline]
pub fn classify(event_type: &EventType) -> EventClass {
    match event_type {
        EventType::Pageview => PAGEVIEW,
        EventType::Click => CLICK,
        EventType::FormSubmit => FORM_SUBMIT,
        EventType::HeatmapClick => HEATMAP_CLICK,
        EventType::Custom(_) => CUSTOM,
    }
}
