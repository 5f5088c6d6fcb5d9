//! Activity feed - headless live feed engine
//!
//! Runs the tracking collector, the session clock and one feed engine,
//! and logs every recomputed view. Useful for watching what a widget
//! would render without a terminal UI.
//!
//! Module structure:
//! - `domain/` - Events and the live event log
//! - `io/` - External interfaces (collector HTTP endpoint, JSONL replay)
//! - `services/` - Feed projection, state machines, clock, runtime
//! - `infra/` - Infrastructure (Config, Metrics)

use activity_feed::domain::{EventLog, SessionId};
use activity_feed::infra::{Config, FeedMetrics};
use activity_feed::io::replay;
use activity_feed::services::ticker::{Extents, Measure};
use activity_feed::services::{FeedEngine, FeedOptions, FeedRuntime, FeedSink, FeedView, SessionClock};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Activity feed - live feed of tracked interaction events
#[derive(Parser, Debug)]
#[command(name = "activity-feed", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// JSONL file of recorded events to replay into the log
    #[arg(long)]
    replay: Option<String>,

    /// Replay with recorded gaps, capped at this many seconds
    #[arg(long)]
    pace_secs: Option<u64>,
}

/// Sink that reports each recomputed view through tracing
struct LogSink {
    last_total: usize,
}

impl Measure for LogSink {
    fn extents(&self) -> Option<Extents> {
        None
    }
}

impl FeedSink for LogSink {
    fn animates(&self) -> bool {
        false
    }

    fn present(&mut self, view: &FeedView) {
        if view.stats.total == self.last_total && view.fresh_count == 0 {
            debug!(
                time_on_page = %view.time_on_page,
                mode = %view.mode.as_str(),
                refresh = ?view.refresh,
                "feed_refreshed"
            );
            return;
        }
        self.last_total = view.stats.total;

        let newest = view.items().first().map(|item| item.event_type.to_string());
        info!(
            total = %view.stats.total,
            new = %view.new_count(),
            visible = %view.items().len(),
            clicks = %view.stats.clicks(),
            pageviews = %view.stats.pageviews(),
            form_submits = %view.stats.form_submits(),
            newest = ?newest,
            mode = %view.mode.as_str(),
            time_on_page = %view.time_on_page,
            "feed_rendered"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "activity-feed starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let session = config
        .session_id()
        .map(|id| SessionId(id.to_string()))
        .unwrap_or_else(SessionId::generate);

    info!(
        config_file = %config.config_file(),
        session = %session.0,
        max_events = %config.max_events(),
        order = %config.order().as_str(),
        ticker_speed = %config.ticker_speed(),
        collector_enabled = %config.collector_enabled(),
        collector_port = %config.collector_port(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let log = Arc::new(EventLog::new(session.clone()));
    let metrics = Arc::new(FeedMetrics::new());

    // Tracking collector
    if config.collector_enabled() {
        let addr: SocketAddr = format!("{}:{}", config.collector_bind_address(), config.collector_port())
            .parse()
            .context("invalid collector bind address")?;
        let collector_log = log.clone();
        let collector_metrics = metrics.clone();
        let collector_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = activity_feed::io::start_collector(
                addr,
                collector_log,
                collector_metrics,
                collector_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "collector_error");
            }
        });
    }

    // Replay recorded events
    if let Some(path) = &args.replay {
        let events = replay::load_events(path)?;
        let replay_log = log.clone();
        let replay_shutdown = shutdown_rx.clone();
        let max_gap = args.pace_secs.map(Duration::from_secs);
        tokio::spawn(async move {
            replay::replay(events, &replay_log, max_gap, replay_shutdown).await;
        });
    }

    // Session clock shared by every observer
    let clock = SessionClock::system(
        Duration::from_millis(config.tick_ms()),
        Duration::from_secs(config.now_refresh_secs()),
    );
    let clock_rx = clock.subscribe();
    tokio::spawn(clock.run(shutdown_rx.clone()));

    // Metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Headless: no user actions, the sender just keeps the channel open
    let (_actions_tx, actions_rx) = mpsc::channel(16);
    let engine = FeedEngine::new(FeedOptions::from_config(&config), session, *clock_rx.borrow());
    let runtime = FeedRuntime::new(
        engine,
        log,
        clock_rx,
        actions_rx,
        Duration::from_millis(config.frame_ms()),
    )
    .with_metrics(metrics);

    let mut sink = LogSink { last_total: 0 };
    runtime.run(&mut sink, shutdown_rx).await;

    info!("activity-feed shutdown complete");
    Ok(())
}
