//! Feed engine: projects the event log into a renderable view
//!
//! `render` is the pull-based projection. A new log generation runs the
//! full pass: window, classify, relative time against the cached clock,
//! new-event flags, detail lines, and stats over the full log. The
//! watermark advances only after every flag of the pass was produced.
//! On the same generation the cached projection is reused; relative
//! times are re-formatted only when the cached `now` moved. User gestures go through `apply`, which keeps the ticker in
//! step with the display state and reports what the frame schedule must
//! do.

use crate::domain::event::{Event, EventType, SessionId};
use crate::domain::event_log::LogSnapshot;
use crate::infra::config::Config;
use crate::services::classifier::{classify, EventClass};
use crate::services::clock::ClockSnapshot;
use crate::services::display::{
    DeviceClass, DisplayMode, DisplayState, PanelTab, ResponsivePolicy,
};
use crate::services::stats::{aggregate, FeedStats};
use crate::services::ticker::{FrameOutcome, Measure, TickerAnimator, TickerState, Transition};
use crate::services::time_format::{format_elapsed, relative_time};
use crate::services::window::{window, RenderKey, Watermark, WindowEntry, WindowOrder};
use smallvec::SmallVec;
use tracing::{debug, info};

/// Shown instead of an empty list
pub const EMPTY_PLACEHOLDER: &str = "No activity recorded yet";

/// Engine options, usually derived from `Config`
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub privacy_url: String,
    pub ticker_speed: f64,
    pub capacity: usize,
    pub ticker_items: usize,
    pub order: WindowOrder,
    pub highlight_initial: bool,
    pub initially_visible: bool,
    pub initially_expanded: bool,
    pub policy: ResponsivePolicy,
    pub session_display_len: usize,
}

impl FeedOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            privacy_url: config.privacy_url().to_string(),
            ticker_speed: config.ticker_speed(),
            capacity: config.max_events(),
            ticker_items: config.ticker_items(),
            order: config.order(),
            highlight_initial: config.highlight_initial(),
            initially_visible: config.initially_visible(),
            initially_expanded: config.initially_expanded(),
            policy: ResponsivePolicy {
                auto_collapse: config.auto_collapse(),
                mini_view: config.mini_view(),
                mobile_breakpoint: config.mobile_breakpoint(),
            },
            session_display_len: config.session_display_len(),
        }
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A labelled property line of the panel view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub label: &'static str,
    pub value: String,
}

impl Detail {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self { label, value: value.into() }
    }
}

/// One rendered feed row
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub key: RenderKey,
    pub log_index: usize,
    pub event_type: EventType,
    pub class: EventClass,
    pub timestamp: i64,
    pub relative_time: String,
    pub is_new: bool,
    /// Compact detail for the ticker
    pub summary: Option<String>,
    pub details: SmallVec<[Detail; 4]>,
}

#[derive(Debug, Clone)]
pub enum FeedContent {
    Empty { placeholder: &'static str },
    Items(Vec<FeedItem>),
}

/// Everything a rendering surface needs for one frame of the feed
#[derive(Debug, Clone)]
pub struct FeedView {
    pub mode: DisplayMode,
    pub minimized: bool,
    pub tab: PanelTab,
    pub device: DeviceClass,
    pub ticker_state: TickerState,
    pub ticker_paused: bool,
    pub order: WindowOrder,
    pub content: FeedContent,
    /// Events appended since the previous render
    pub fresh_count: usize,
    pub stats: FeedStats,
    pub time_on_page: String,
    pub session_short: String,
    pub privacy_url: String,
    pub refresh: Refresh,
    ticker_len: usize,
}

impl FeedView {
    pub fn items(&self) -> &[FeedItem] {
        match &self.content {
            FeedContent::Empty { .. } => &[],
            FeedContent::Items(items) => items,
        }
    }

    /// The most recent `ticker_items` rows, in display order
    pub fn ticker_items(&self) -> &[FeedItem] {
        let items = self.items();
        let n = self.ticker_len.min(items.len());
        match self.order {
            WindowOrder::NewestFirst => &items[..n],
            WindowOrder::OldestFirst => &items[items.len() - n..],
        }
    }

    pub fn new_count(&self) -> usize {
        self.items().iter().filter(|item| item.is_new).count()
    }
}

/// How `render` produced a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// New log generation: window, flags and stats recomputed
    Projected,
    /// Same generation, new `now`: relative times re-formatted
    Retimed,
    /// Same generation and `now`: cached rows reused as they were
    Reused,
}

/// Last full pass over one log generation
struct Projection {
    log: LogSnapshot,
    items: Vec<FeedItem>,
    stats: FeedStats,
    fresh_count: usize,
    now_ms: i64,
}

impl Projection {
    /// Bring cached rows up to date for a re-render of the same generation
    fn refresh(&mut self, now_ms: i64) -> Refresh {
        // Flags belong to the pass that saw the events arrive
        if self.fresh_count > 0 {
            self.items.iter_mut().for_each(|item| item.is_new = false);
            self.fresh_count = 0;
        }
        if self.now_ms == now_ms {
            return Refresh::Reused;
        }
        for item in &mut self.items {
            item.relative_time = relative_time(item.timestamp, now_ms);
        }
        self.now_ms = now_ms;
        Refresh::Retimed
    }
}

/// User gestures and surface notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Show,
    Hide,
    ToggleVisible,
    Expand,
    Collapse,
    ToggleExpanded,
    Pause,
    Resume,
    TogglePause,
    Resize(u32),
    NextTab,
    SelectTab(PanelTab),
}

/// Compact ticker detail, if the type has one
fn ticker_summary(event: &Event) -> Option<String> {
    match event.event_type {
        EventType::Pageview => Some(event.page_path().to_string()),
        EventType::Click => Some(event.element_label()),
        _ => None,
    }
}

/// Panel detail lines with neutral fallbacks for missing fields
fn describe(event: &Event) -> SmallVec<[Detail; 4]> {
    let mut details = SmallVec::new();
    match &event.event_type {
        EventType::Pageview => {
            details.push(Detail::new("path", event.page_path()));
            if let Some(title) = event.title.as_deref().filter(|t| !t.is_empty()) {
                details.push(Detail::new("title", title));
            }
        }
        t if t.is_click_like() => {
            details.push(Detail::new("element", event.element_label()));
            if let Some(pos) = event.position {
                details.push(Detail::new(
                    "position",
                    format!("{}, {}", pos.x.round(), pos.y.round()),
                ));
            }
            if let Some(label) = event.target_label() {
                details.push(Detail::new("label", label));
            }
        }
        EventType::FormSubmit => {
            details.push(Detail::new("form", event.form_name()));
            if let Some(fields) = event.field_count() {
                details.push(Detail::new("fields", format!("{fields} field(s)")));
            }
        }
        _ => {
            if event.target.is_some() {
                details.push(Detail::new("element", event.element_label()));
            }
            if let Some(label) = event.target_label() {
                details.push(Detail::new("label", label));
            }
        }
    }
    details
}

fn build_item(entry: &WindowEntry<'_>, is_new: bool, now_ms: i64) -> FeedItem {
    let event = entry.event;
    FeedItem {
        key: entry.key(),
        log_index: entry.log_index,
        event_type: event.event_type.clone(),
        class: classify(&event.event_type),
        timestamp: event.timestamp,
        relative_time: relative_time(event.timestamp, now_ms),
        is_new,
        summary: ticker_summary(event),
        details: describe(event),
    }
}

/// Per-widget feed state; one per mounted surface
pub struct FeedEngine {
    options: FeedOptions,
    session: SessionId,
    display: DisplayState,
    watermark: Watermark,
    ticker: TickerAnimator,
    clock: ClockSnapshot,
    projection: Option<Projection>,
    torn_down: bool,
}

impl FeedEngine {
    pub fn new(options: FeedOptions, session: SessionId, clock: ClockSnapshot) -> Self {
        let display =
            DisplayState::new(options.initially_visible, options.initially_expanded, options.policy);
        let watermark = Watermark::new(options.highlight_initial);
        let ticker = TickerAnimator::new(options.ticker_speed);
        Self {
            options,
            session,
            display,
            watermark,
            ticker,
            clock,
            projection: None,
            torn_down: false,
        }
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn ticker(&self) -> &TickerAnimator {
        &self.ticker
    }

    pub fn clock(&self) -> ClockSnapshot {
        self.clock
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Mount the widget; starts the ticker if the display allows it
    pub fn mount(&mut self) -> Transition {
        self.torn_down = false;
        let transition = self.ticker.mount(&self.display);
        info!(
            mode = %self.display.mode().as_str(),
            ticker = %self.ticker.state().as_str(),
            capacity = %self.options.capacity,
            "feed_mounted"
        );
        transition
    }

    /// Unmount: the ticker goes idle; the caller cancels every schedule
    pub fn teardown(&mut self) -> Transition {
        self.torn_down = true;
        let transition = self.ticker.unmount();
        info!(time_spent_secs = %self.clock.time_spent_secs, "feed_torn_down");
        transition
    }

    pub fn set_clock(&mut self, clock: ClockSnapshot) {
        self.clock = clock;
    }

    /// Apply a gesture and bring the ticker in line with the new display
    pub fn apply(&mut self, action: Action) -> Transition {
        match action {
            Action::Show => self.display.show(),
            Action::Hide => self.display.hide(),
            Action::ToggleVisible => self.display.toggle_visible(),
            Action::Expand => self.display.expand(),
            Action::Collapse => self.display.collapse(),
            Action::ToggleExpanded => self.display.toggle_expanded(),
            Action::Resize(width) => self.display.on_resize(width),
            Action::NextTab => self.display.next_tab(),
            Action::SelectTab(tab) => self.display.select_tab(tab),
            Action::Pause => return self.ticker.pause(&self.display),
            Action::Resume => return self.ticker.resume(&self.display),
            Action::TogglePause => return self.ticker.toggle_pause(&self.display),
        }
        let transition = self.ticker.sync(&self.display);
        debug!(
            action = ?action,
            mode = %self.display.mode().as_str(),
            ticker = %self.ticker.state().as_str(),
            "feed_action_applied"
        );
        transition
    }

    /// Whether `log` is a different generation than the last rendered one
    pub fn should_recompute(&self, log: &LogSnapshot) -> bool {
        self.projection.as_ref().map_or(true, |last| !last.log.same_generation(log))
    }

    /// View of `log`; runs the full projection only for a new generation
    pub fn render(&mut self, log: &LogSnapshot) -> FeedView {
        let now_ms = self.clock.now_ms;
        let (projection, refresh) = match self.projection.take() {
            Some(mut cached) if cached.log.same_generation(log) => {
                let refresh = cached.refresh(now_ms);
                (cached, refresh)
            }
            _ => (self.project(log), Refresh::Projected),
        };
        let view = self.view(&projection, refresh);
        self.projection = Some(projection);
        view
    }

    /// Window, flags and stats for `log`, then advance the watermark
    fn project(&mut self, log: &LogSnapshot) -> Projection {
        let events = log.events();
        let order = self.options.order;
        let entries = window(events, self.options.capacity, order);
        let now_ms = self.clock.now_ms;

        let pass = self.watermark.begin_pass(events.len());
        let items: Vec<FeedItem> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| build_item(entry, pass.is_new(i, entries.len(), order), now_ms))
            .collect();
        let fresh_count = pass.fresh_count();
        pass.finish();

        debug!(total = %events.len(), visible = %items.len(), fresh = %fresh_count, "feed_projected");

        Projection {
            log: log.clone(),
            items,
            stats: aggregate(events),
            fresh_count,
            now_ms,
        }
    }

    fn view(&self, projection: &Projection, refresh: Refresh) -> FeedView {
        let content = if projection.items.is_empty() {
            FeedContent::Empty { placeholder: EMPTY_PLACEHOLDER }
        } else {
            FeedContent::Items(projection.items.clone())
        };

        FeedView {
            mode: self.display.mode(),
            minimized: self.display.is_minimized(),
            tab: self.display.tab(),
            device: self.display.device_class(),
            ticker_state: self.ticker.state(),
            ticker_paused: self.ticker.is_user_paused(),
            order: self.options.order,
            content,
            fresh_count: projection.fresh_count,
            stats: projection.stats.clone(),
            time_on_page: format_elapsed(self.clock.time_spent_secs),
            session_short: self.session.short(self.options.session_display_len).to_string(),
            privacy_url: self.options.privacy_url.clone(),
            refresh,
            ticker_len: self.options.ticker_items,
        }
    }

    /// Advance the ticker by one animation frame
    pub fn frame(&mut self, timestamp_ms: f64, measure: &dyn Measure) -> FrameOutcome {
        self.ticker.frame(timestamp_ms, measure)
    }

    pub fn ticker_offset(&self) -> f64 {
        self.ticker.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Target;
    use crate::services::ticker::Extents;
    use serde_json::json;

    const NOW: i64 = 1_767_617_600_000;

    fn clock() -> ClockSnapshot {
        ClockSnapshot { time_spent_secs: 65, now_ms: NOW }
    }

    fn engine(options: FeedOptions) -> FeedEngine {
        let mut engine =
            FeedEngine::new(options, SessionId("0192f1c2-7d3e-7abc-9def".to_string()), clock());
        engine.mount();
        engine
    }

    fn options(capacity: usize, highlight_initial: bool) -> FeedOptions {
        FeedOptions { capacity, highlight_initial, ..FeedOptions::default() }
    }

    fn clicks(n: usize) -> Vec<Event> {
        (0..n).map(|i| Event::new(EventType::Click, NOW - (n - i) as i64 * 1000)).collect()
    }

    #[test]
    fn test_empty_log_shows_placeholder() {
        let mut engine = engine(FeedOptions::default());
        let view = engine.render(&LogSnapshot::default());

        assert!(matches!(view.content, FeedContent::Empty { placeholder: EMPTY_PLACEHOLDER }));
        assert!(view.items().is_empty());
        assert!(view.ticker_items().is_empty());
        assert_eq!(view.stats.total, 0);
        assert_eq!(view.time_on_page, "01:05");
        assert_eq!(view.session_short, "0192f1c2");
    }

    #[test]
    fn test_window_bounded_but_stats_full() {
        let mut engine = engine(options(5, false));
        let view = engine.render(&LogSnapshot::from_events(clicks(120)));

        assert_eq!(view.items().len(), 5);
        assert_eq!(view.stats.total, 120);
        assert_eq!(view.stats.clicks(), 120);
        assert_eq!(view.items()[0].log_index, 119);
    }

    #[test]
    fn test_new_flags_then_idempotent() {
        let mut engine = engine(options(10, false));
        let mut events = clicks(3);

        // First render is calm
        let first = engine.render(&LogSnapshot::from_events(events.clone()));
        assert_eq!(first.new_count(), 0);

        events.extend(clicks(4));
        let log = LogSnapshot::from_events(events);
        let second = engine.render(&log);
        let flags: Vec<bool> = second.items().iter().map(|i| i.is_new).collect();
        assert_eq!(flags, vec![true, true, true, true, false, false, false]);
        assert_eq!(second.fresh_count, 4);

        // Same generation again: same window, same stats, nothing new
        assert!(!engine.should_recompute(&log));
        let third = engine.render(&log);
        assert_eq!(third.new_count(), 0);
        assert_eq!(third.fresh_count, 0);
        assert_eq!(third.refresh, Refresh::Reused);
        assert_eq!(third.items().len(), second.items().len());
        assert_eq!(third.stats, second.stats);
        let keys = |v: &FeedView| v.items().iter().map(|i| i.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&third), keys(&second));
    }

    #[test]
    fn test_initial_highlight_when_enabled() {
        let mut engine = engine(options(10, true));
        let view = engine.render(&LogSnapshot::from_events(clicks(3)));
        assert_eq!(view.new_count(), 3);
    }

    #[test]
    fn test_should_recompute_tracks_generation() {
        let mut engine = engine(FeedOptions::default());
        let log = LogSnapshot::from_events(clicks(2));
        assert!(engine.should_recompute(&log));
        engine.render(&log);
        assert!(!engine.should_recompute(&log.clone()));
        assert!(engine.should_recompute(&LogSnapshot::from_events(clicks(2))));
    }

    #[test]
    fn test_relative_time_uses_cached_clock() {
        let mut engine = engine(FeedOptions::default());
        let log = LogSnapshot::from_events(vec![Event::new(EventType::Pageview, NOW - 60_000)]);

        assert_eq!(engine.render(&log).items()[0].relative_time, "1m ago");
        engine.set_clock(ClockSnapshot { time_spent_secs: 66, now_ms: NOW + 3_600_000 });
        let view = engine.render(&log);
        assert_eq!(view.refresh, Refresh::Retimed);
        assert_eq!(view.items()[0].relative_time, "1h ago");
    }

    #[test]
    fn test_counter_ticks_reuse_projection() {
        let mut engine = engine(options(10, false));
        let log = LogSnapshot::from_events(clicks(1000));
        let first = engine.render(&log);
        assert_eq!(first.refresh, Refresh::Projected);
        assert_eq!(first.items()[0].relative_time, "just now");

        for secs in 66..76 {
            engine.set_clock(ClockSnapshot { time_spent_secs: secs, now_ms: NOW });
            let view = engine.render(&log);
            assert_eq!(view.refresh, Refresh::Reused);
            assert_eq!(view.stats.total, 1000);
            assert_eq!(view.items()[0].relative_time, "just now");
        }
        assert_eq!(engine.render(&log).time_on_page, "01:15");

        let mut events = clicks(1000);
        events.push(Event::new(EventType::Pageview, NOW));
        assert_eq!(engine.render(&LogSnapshot::from_events(events)).refresh, Refresh::Projected);
    }

    #[test]
    fn test_details_and_fallbacks() {
        let events = vec![
            Event::new(EventType::Pageview, NOW)
                .with_metadata("path", json!("/shop"))
                .with_title("Shop"),
            Event::new(EventType::Click, NOW)
                .with_target(Target {
                    tag_name: Some("BUTTON".to_string()),
                    category: Some("cart".to_string()),
                    label: Some("Add to cart".to_string()),
                    ..Default::default()
                })
                .with_position(10.4, 20.6),
            Event::new(EventType::FormSubmit, NOW)
                .with_metadata("formName", json!("payment"))
                .with_metadata("fields", json!(["card", "cvc"])),
            Event::new(EventType::HeatmapClick, NOW),
            Event::new(EventType::Custom("scroll_depth".to_string()), NOW),
        ];

        let mut engine = engine(options(10, false));
        let view = engine.render(&LogSnapshot::from_events(events));
        let items = view.items();

        // Newest first
        assert_eq!(items[4].event_type, EventType::Pageview);
        assert_eq!(items[4].summary.as_deref(), Some("/shop"));
        assert_eq!(
            items[4].details.to_vec(),
            vec![Detail::new("path", "/shop"), Detail::new("title", "Shop")]
        );

        assert_eq!(items[3].summary.as_deref(), Some("BUTTON [cart]"));
        assert_eq!(items[3].details[1], Detail::new("position", "10, 21"));
        assert_eq!(items[3].details[2], Detail::new("label", "Add to cart"));

        assert_eq!(items[2].details[0], Detail::new("form", "payment"));
        assert_eq!(items[2].details[1], Detail::new("fields", "2 field(s)"));

        assert_eq!(items[1].details.to_vec(), vec![Detail::new("element", "element")]);
        assert_eq!(items[1].class.style_class, "event-heatmap");

        assert_eq!(items[0].class.style_class, "event-custom");
        assert!(items[0].details.is_empty());
        assert_eq!(items[0].summary, None);
        assert_eq!(items[0].key, RenderKey::Position(4));
    }

    #[test]
    fn test_ticker_items_follow_order() {
        let events = clicks(8);
        let mut newest = engine(options(8, false));
        let view = newest.render(&LogSnapshot::from_events(events.clone()));
        let idx: Vec<usize> = view.ticker_items().iter().map(|i| i.log_index).collect();
        assert_eq!(idx, vec![7, 6, 5, 4, 3]);

        let mut oldest =
            engine(FeedOptions { order: WindowOrder::OldestFirst, ..options(8, false) });
        let view = oldest.render(&LogSnapshot::from_events(events));
        let idx: Vec<usize> = view.ticker_items().iter().map(|i| i.log_index).collect();
        assert_eq!(idx, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_actions_drive_ticker_schedule() {
        let mut engine = engine(FeedOptions::default());
        assert!(engine.ticker().is_running());

        assert_eq!(engine.apply(Action::Expand), Transition::Stopped);
        assert_eq!(engine.apply(Action::NextTab), Transition::Unchanged);
        assert_eq!(engine.apply(Action::Collapse), Transition::Started);
        assert_eq!(engine.apply(Action::Hide), Transition::Stopped);
        assert_eq!(engine.apply(Action::Show), Transition::Started);
        assert_eq!(engine.apply(Action::TogglePause), Transition::Stopped);
        assert_eq!(engine.apply(Action::Resume), Transition::Started);

        // Narrow viewport while expanded: auto-collapse, ticker resumes
        engine.apply(Action::Expand);
        assert_eq!(engine.apply(Action::Resize(480)), Transition::Started);
        assert_eq!(engine.display().mode(), DisplayMode::Collapsed);
    }

    #[test]
    fn test_frames_move_ticker_only_while_running() {
        let mut engine = engine(FeedOptions { ticker_speed: 40.0, ..FeedOptions::default() });
        let extents = Extents::new(500.0, 200.0);
        engine.frame(0.0, &extents);
        engine.frame(500.0, &extents);
        assert_eq!(engine.ticker_offset(), -20.0);

        engine.apply(Action::Hide);
        assert_eq!(engine.frame(1000.0, &extents), FrameOutcome::Inactive);
        assert_eq!(engine.ticker_offset(), -20.0);
    }

    #[test]
    fn test_teardown_stops_ticker() {
        let mut engine = engine(FeedOptions::default());
        assert_eq!(engine.teardown(), Transition::Stopped);
        assert!(engine.is_torn_down());
        assert_eq!(engine.ticker().state(), TickerState::Idle);
    }
}
