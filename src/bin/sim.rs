//! Feed simulator - posts synthetic shopper events to the collector
//!
//! Walks a small storefront journey (home, shop, add to cart, payment,
//! checkout form, heat map clicks) and sends each step fire-and-forget.
//!
//! Usage:
//!   cargo run --bin feed-sim -- --interval-ms 800 --count 40

use activity_feed::domain::{epoch_ms, Event, EventType, Target};
use clap::Parser;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "feed-sim", about = "Post synthetic tracking events to the collector")]
struct Args {
    /// Collector track endpoint
    #[arg(long, default_value = "http://127.0.0.1:3001/api/track")]
    url: String,

    /// Delay between steps
    #[arg(long, default_value_t = 1500)]
    interval_ms: u64,

    /// Stop after this many steps (runs until Ctrl+C otherwise)
    #[arg(long)]
    count: Option<u64>,

    /// Events per request; >1 sends arrays
    #[arg(long, default_value_t = 1)]
    batch: usize,
}

fn button(label: &str, category: &str) -> Target {
    Target {
        tag_name: Some("BUTTON".to_string()),
        id: Some(label.to_lowercase().replace(' ', "-")),
        category: Some(category.to_string()),
        label: Some(label.to_string()),
        form_id: None,
    }
}

/// The `step`-th event of the simulated journey
fn journey_event(step: u64) -> Event {
    let now = epoch_ms();
    let event = match step % 9 {
        0 => Event::new(EventType::Pageview, now)
            .with_metadata("path", json!("/"))
            .with_url("http://localhost:3000/")
            .with_title("Home"),
        1 => Event::new(EventType::Click, now).with_target(button("Shop now", "navigation")),
        2 => Event::new(EventType::Pageview, now)
            .with_metadata("path", json!("/shop"))
            .with_url("http://localhost:3000/shop?ref=home")
            .with_title("Shop"),
        3 => Event::new(EventType::HeatmapClick, now)
            .with_position(120.0 + (step % 7) as f64 * 40.0, 340.0),
        4 => Event::new(EventType::Click, now)
            .with_target(button("Add to cart", "cart"))
            .with_metadata("productId", json!(step % 4 + 1)),
        5 => Event::new(EventType::Pageview, now)
            .with_metadata("path", json!("/payment"))
            .with_title("Payment"),
        6 => Event::new(EventType::FormSubmit, now)
            .with_metadata("formName", json!("payment"))
            .with_metadata("fields", json!(["name", "card", "expiry", "cvc"])),
        7 => Event::new(EventType::Custom("scroll_depth".to_string()), now)
            .with_metadata("percent", json!(75)),
        _ => Event::new(EventType::Pageview, now)
            .with_metadata("path", json!("/about"))
            .with_title("About"),
    };
    event.with_id(&Uuid::now_v7().to_string())
}

/// Events to send at `step`; the last batch is clamped to `count`
fn next_batch(step: u64, batch: u64, count: Option<u64>) -> u64 {
    count.map_or(batch, |count| count.saturating_sub(step).min(batch))
}

/// Fire-and-forget post; failures are only logged
fn track_event(client: &reqwest::Client, url: &str, events: Vec<Event>, failures: Arc<AtomicU64>) {
    let request = if events.len() == 1 {
        client.post(url).json(&events[0])
    } else {
        client.post(url).json(&events)
    };
    let count = events.len();

    tokio::spawn(async move {
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(count = %count, status = %resp.status(), "sim_events_sent");
            }
            Ok(resp) => {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(count = %count, status = %resp.status(), "sim_events_rejected");
            }
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(count = %count, error = %e, "sim_send_failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let failures = Arc::new(AtomicU64::new(0));
    let batch = args.batch.max(1) as u64;

    info!(url = %args.url, interval_ms = %args.interval_ms, batch = %batch, "sim_started");

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut step = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        let size = next_batch(step, batch, args.count);
        if size == 0 {
            break;
        }
        let events = (0..size).map(|i| journey_event(step + i)).collect();
        track_event(&client, &args.url, events, failures.clone());
        step += size;
    }

    // Let in-flight posts settle before reporting
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!(steps = %step, failures = %failures.load(Ordering::Relaxed), "sim_finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journey_covers_every_known_type() {
        let types: Vec<EventType> = (0..9).map(|step| journey_event(step).event_type).collect();
        for expected in [
            EventType::Pageview,
            EventType::Click,
            EventType::FormSubmit,
            EventType::HeatmapClick,
        ] {
            assert!(types.contains(&expected));
        }
        assert!(journey_event(0).event_id.is_some());
    }

    #[test]
    fn test_count_caps_batched_sends() {
        let sizes: Vec<u64> = (0..)
            .scan(0, |step, _| {
                let size = next_batch(*step, 3, Some(7));
                *step += size;
                (size > 0).then_some(size)
            })
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(next_batch(40, 5, None), 5);
        assert_eq!(next_batch(8, 2, Some(7)), 0);
    }

    #[test]
    fn test_journey_payload_matches_wire_format() {
        let value = serde_json::to_value(journey_event(4)).unwrap();
        assert_eq!(value["eventType"], "click");
        assert_eq!(value["target"]["tagName"], "BUTTON");
        assert_eq!(value["target"]["category"], "cart");
    }
}
