//! Integration tests for configuration loading

use activity_feed::infra::Config;
use activity_feed::services::window::WindowOrder;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[feed]
privacy_url = "/legal/privacy"
ticker_speed = 45.0
max_events = 20
ticker_items = 3
initially_expanded = true
auto_collapse = false
order = "oldest_first"
mobile_breakpoint = 600

[clock]
tick_ms = 500
now_refresh_secs = 10
frame_ms = 33

[collector]
enabled = false
bind_address = "0.0.0.0"
port = 4001

[session]
id = "0192f1c2-aaaa-7bbb-8ccc-123456789abc"

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.privacy_url(), "/legal/privacy");
    assert_eq!(config.ticker_speed(), 45.0);
    assert_eq!(config.max_events(), 20);
    assert_eq!(config.ticker_items(), 3);
    assert!(config.initially_expanded());
    assert!(!config.auto_collapse());
    assert!(config.mini_view());
    assert_eq!(config.order(), WindowOrder::OldestFirst);
    assert_eq!(config.mobile_breakpoint(), 600);
    assert_eq!(config.tick_ms(), 500);
    assert_eq!(config.now_refresh_secs(), 10);
    assert_eq!(config.frame_ms(), 33);
    assert!(!config.collector_enabled());
    assert_eq!(config.collector_bind_address(), "0.0.0.0");
    assert_eq!(config.collector_port(), 4001);
    assert_eq!(config.session_id(), Some("0192f1c2-aaaa-7bbb-8ccc-123456789abc"));
    assert_eq!(config.metrics_interval_secs(), 15);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[feed]\nmax_events = 5\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.max_events(), 5);
    assert_eq!(config.ticker_speed(), 30.0);
    assert_eq!(config.collector_port(), 3001);
    assert_eq!(config.order(), WindowOrder::NewestFirst);
    assert_eq!(config.session_id(), None);
}

#[test]
fn test_invalid_config_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[feed]\nmax_events = \"many\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.max_events(), 100);
    assert_eq!(config.collector_port(), 3001);
    assert!(config.initially_visible());
}
