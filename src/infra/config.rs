//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every section and key is optional; missing values take the defaults
//! below.

use crate::services::window::WindowOrder;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    /// Footer link target
    #[serde(default = "default_privacy_url")]
    pub privacy_url: String,
    /// Ticker scroll speed in pixels (terminal columns) per second
    #[serde(default = "default_ticker_speed")]
    pub ticker_speed: f64,
    /// Window capacity
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Events shown in the collapsed ticker
    #[serde(default = "default_ticker_items")]
    pub ticker_items: usize,
    #[serde(default = "default_true")]
    pub initially_visible: bool,
    #[serde(default)]
    pub initially_expanded: bool,
    #[serde(default = "default_true")]
    pub auto_collapse: bool,
    #[serde(default = "default_true")]
    pub mini_view: bool,
    #[serde(default = "default_mobile_breakpoint")]
    pub mobile_breakpoint: u32,
    #[serde(default)]
    pub order: WindowOrder,
    /// Flag every event as new on the first render
    #[serde(default)]
    pub highlight_initial: bool,
    /// Characters of the session id shown
    #[serde(default = "default_session_display_len")]
    pub session_display_len: usize,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            privacy_url: default_privacy_url(),
            ticker_speed: default_ticker_speed(),
            max_events: default_max_events(),
            ticker_items: default_ticker_items(),
            initially_visible: true,
            initially_expanded: false,
            auto_collapse: true,
            mini_view: true,
            mobile_breakpoint: default_mobile_breakpoint(),
            order: WindowOrder::default(),
            highlight_initial: false,
            session_display_len: default_session_display_len(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_privacy_url() -> String {
    "/privacy".to_string()
}

fn default_ticker_speed() -> f64 {
    30.0
}

fn default_max_events() -> usize {
    100
}

fn default_ticker_items() -> usize {
    5
}

fn default_mobile_breakpoint() -> u32 {
    768
}

fn default_session_display_len() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockSection {
    /// Time-on-page counter period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Refresh period of the cached "now" used for relative timestamps
    #[serde(default = "default_now_refresh_secs")]
    pub now_refresh_secs: u64,
    /// Ticker frame period
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            now_refresh_secs: default_now_refresh_secs(),
            frame_ms: default_frame_ms(),
        }
    }
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_now_refresh_secs() -> u64 {
    5
}

fn default_frame_ms() -> u64 {
    16
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_collector_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_collector_port")]
    pub port: u16,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_collector_bind_address(),
            port: default_collector_port(),
        }
    }
}

fn default_collector_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_collector_port() -> u16 {
    3001
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionSection {
    /// Fixed session id; a UUIDv7 is generated when absent
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub clock: ClockSection,
    #[serde(default)]
    pub collector: CollectorSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    privacy_url: String,
    ticker_speed: f64,
    max_events: usize,
    ticker_items: usize,
    initially_visible: bool,
    initially_expanded: bool,
    auto_collapse: bool,
    mini_view: bool,
    mobile_breakpoint: u32,
    order: WindowOrder,
    highlight_initial: bool,
    session_display_len: usize,
    tick_ms: u64,
    now_refresh_secs: u64,
    frame_ms: u64,
    collector_enabled: bool,
    collector_bind_address: String,
    collector_port: u16,
    session_id: Option<String>,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let TomlConfig { feed, clock, collector, session, metrics } = toml_config;
        Self {
            privacy_url: feed.privacy_url,
            ticker_speed: feed.ticker_speed,
            max_events: feed.max_events,
            ticker_items: feed.ticker_items,
            initially_visible: feed.initially_visible,
            initially_expanded: feed.initially_expanded,
            auto_collapse: feed.auto_collapse,
            mini_view: feed.mini_view,
            mobile_breakpoint: feed.mobile_breakpoint,
            order: feed.order,
            highlight_initial: feed.highlight_initial,
            session_display_len: feed.session_display_len,
            // Zero periods would spin the scheduler
            tick_ms: clock.tick_ms.max(1),
            now_refresh_secs: clock.now_refresh_secs.max(1),
            frame_ms: clock.frame_ms.max(1),
            collector_enabled: collector.enabled,
            collector_bind_address: collector.bind_address,
            collector_port: collector.port,
            session_id: session.id.filter(|id| !id.is_empty()),
            metrics_interval_secs: metrics.interval_secs.max(1),
            config_file: config_file.to_string(),
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load configuration - resolves the path from args/env first
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(Self::resolve_config_path(args))
    }

    pub fn privacy_url(&self) -> &str {
        &self.privacy_url
    }

    pub fn ticker_speed(&self) -> f64 {
        self.ticker_speed
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn ticker_items(&self) -> usize {
        self.ticker_items
    }

    pub fn initially_visible(&self) -> bool {
        self.initially_visible
    }

    pub fn initially_expanded(&self) -> bool {
        self.initially_expanded
    }

    pub fn auto_collapse(&self) -> bool {
        self.auto_collapse
    }

    pub fn mini_view(&self) -> bool {
        self.mini_view
    }

    pub fn mobile_breakpoint(&self) -> u32 {
        self.mobile_breakpoint
    }

    pub fn order(&self) -> WindowOrder {
        self.order
    }

    pub fn highlight_initial(&self) -> bool {
        self.highlight_initial
    }

    pub fn session_display_len(&self) -> usize {
        self.session_display_len
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn now_refresh_secs(&self) -> u64 {
        self.now_refresh_secs
    }

    pub fn frame_ms(&self) -> u64 {
        self.frame_ms
    }

    pub fn collector_enabled(&self) -> bool {
        self.collector_enabled
    }

    pub fn collector_bind_address(&self) -> &str {
        &self.collector_bind_address
    }

    pub fn collector_port(&self) -> u16 {
        self.collector_port
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests and binaries to override the window capacity
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Builder method to override the collector port (0 picks a free port)
    pub fn with_collector_port(mut self, port: u16) -> Self {
        self.collector_port = port;
        self
    }

    /// Builder method to toggle the first-render highlight
    pub fn with_highlight_initial(mut self, highlight: bool) -> Self {
        self.highlight_initial = highlight;
        self
    }
}
