//! Mock tracking collector HTTP endpoint
//!
//! Accepts tracking events at POST /api/track (one object or an array),
//! appends them to the session's event log and acknowledges with the
//! number processed. GET /health answers `ok`. Uses hyper for the HTTP
//! server.

use crate::domain::event::{epoch_ms, Event};
use crate::domain::event_log::EventLog;
use crate::infra::metrics::FeedMetrics;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Parse a track request body into events.
///
/// A single object and an array of objects are both accepted. Events
/// without a timestamp are stamped with `received_ms`.
pub fn parse_batch(body: &[u8], received_ms: i64) -> Result<Vec<Event>, serde_json::Error> {
    let items = match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .map(|mut item| {
            if let Value::Object(map) = &mut item {
                map.entry("timestamp").or_insert_with(|| json!(received_ms));
            }
            serde_json::from_value(item)
        })
        .collect()
}

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

async fn track(
    req: Request<hyper::body::Incoming>,
    log: &EventLog,
    metrics: &FeedMetrics,
) -> Response<Full<Bytes>> {
    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            metrics.record_rejected();
            warn!(error = %e, "collector_body_rejected");
            return json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "success": false, "message": "Request body too large" }),
            );
        }
    };

    let events = match parse_batch(&body, epoch_ms()) {
        Ok(events) => events,
        Err(e) => {
            metrics.record_rejected();
            warn!(error = %e, bytes = %body.len(), "collector_malformed_request");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": format!("Invalid tracking payload: {e}") }),
            );
        }
    };

    for (i, event) in events.iter().enumerate() {
        debug!(
            index = %(i + 1),
            event_type = %event.event_type,
            event_id = ?event.event_id,
            "tracking_event_received"
        );
    }

    let count = events.len();
    let total = log.extend(events);
    metrics.record_batch(count);
    info!(count = %count, total = %total, "tracking_batch_processed");

    json_response(
        StatusCode::OK,
        json!({ "success": true, "message": format!("Processed {count} events") }),
    )
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    log: Arc<EventLog>,
    metrics: Arc<FeedMetrics>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/api/track") => Ok(track(req, &log, &metrics).await),
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        (&Method::OPTIONS, "/api/track") => Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Serve collector requests on an already bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    log: Arc<EventLog>,
    metrics: Arc<FeedMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let log = log.clone();
                        let metrics = metrics.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                handle_request(req, log.clone(), metrics.clone())
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "collector_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "collector_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("collector_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the collector and serve until shutdown
pub async fn start_collector(
    addr: SocketAddr,
    log: Arc<EventLog>,
    metrics: Arc<FeedMetrics>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, session = %log.session_id().0, "collector_started");
    serve(listener, log, metrics, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventType, SessionId};

    #[test]
    fn test_parse_single_and_array() {
        let single = br#"{"eventType":"click","timestamp":5,"target":{"tagName":"A"}}"#;
        let events = parse_batch(single, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Click);
        assert_eq!(events[0].timestamp, 5);

        let array = br#"[{"eventType":"pageview","timestamp":1},{"eventType":"scroll","timestamp":2}]"#;
        let events = parse_batch(array, 0).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::Custom("scroll".to_string()));
    }

    #[test]
    fn test_parse_stamps_missing_timestamp() {
        let events = parse_batch(br#"{"eventType":"form_submit"}"#, 42).unwrap();
        assert_eq!(events[0].timestamp, 42);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_batch(b"{not json", 0).is_err());
        assert!(parse_batch(br#"{"timestamp":1}"#, 0).is_err());
        assert!(parse_batch(br#"[1, 2]"#, 0).is_err());
    }

    #[tokio::test]
    async fn test_track_endpoint_appends_to_log() {
        let log = Arc::new(EventLog::new(SessionId("s".to_string())));
        let metrics = Arc::new(FeedMetrics::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, log.clone(), metrics.clone(), shutdown_rx));

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{addr}/api/track"))
            .body(r#"[{"eventType":"click","timestamp":1},{"eventType":"pageview","timestamp":2}]"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "success": true, "message": "Processed 2 events" }));
        assert_eq!(log.len(), 2);

        let resp = client
            .post(format!("http://{addr}/api/track"))
            .body("garbage")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(log.len(), 2);
        assert_eq!(metrics.requests_rejected(), 1);

        let health = client.get(format!("http://{addr}/health")).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        shutdown_tx.send(true).unwrap();
        server.await.unwrap().unwrap();
    }
}
