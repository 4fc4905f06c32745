//! Prometheus metrics for the chat temperature CLI.
//!
//! Exposes:
//! - `chat_temperature_command_duration_seconds` (histogram)
//! - `chat_temperature_command_total` (counter with status)
//! - `chat_temperature_command_inflight` (gauge)
//! - `chat_temperature_parsed_messages_total` (counter by platform)
//! - `chat_temperature_score` (histogram of computed temperatures)
//! - `chat_temperature_narrative_total` (counter by outcome)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram, register_histogram_vec, register_int_counter_vec,
    register_int_gauge_vec, Encoder, Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
    TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::conversation::Platform;

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // 5ms .. ~80s; parsing is fast, the narrative step is a network call.
    let buckets =
        prometheus::exponential_buckets(0.005, 2.0, 15).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "chat_temperature_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_temperature_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "chat_temperature_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

static PARSED_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_temperature_parsed_messages_total",
        "Messages kept after parsing and windowing",
        &["platform"]
    )
    .expect("failed to register parsed messages counter")
});

static TEMPERATURE: Lazy<Histogram> = Lazy::new(|| {
    let buckets =
        prometheus::linear_buckets(10.0, 10.0, 10).expect("failed to create histogram buckets");
    register_histogram!(
        "chat_temperature_score",
        "Computed relationship temperatures",
        buckets
    )
    .expect("failed to register temperature histogram")
});

static NARRATIVE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chat_temperature_narrative_total",
        "Narrative requests by outcome",
        &["situation", "outcome"]
    )
    .expect("failed to register narrative counter")
});

fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
    Lazy::force(&PARSED_MESSAGES);
    Lazy::force(&TEMPERATURE);
    Lazy::force(&NARRATIVE_TOTAL);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

pub fn record_parsed_messages(platform: Platform, count: usize) {
    PARSED_MESSAGES
        .with_label_values(&[platform.as_str()])
        .inc_by(count as u64);
}

pub fn observe_temperature(temperature: u8) {
    TEMPERATURE.observe(f64::from(temperature));
}

/// `fallback` is true when the default payload replaced the model output.
pub fn record_narrative(situation: &str, fallback: bool) {
    NARRATIVE_TOTAL
        .with_label_values(&[situation, if fallback { "fallback" } else { "ok" }])
        .inc();
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ));
    }

    let mut response = text_response(StatusCode::OK, buffer);
    if let Ok(content_type) = HeaderValue::from_str(encoder.format_type()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(text_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn scrape() -> String {
        let response = metrics_response().await.expect("metrics response");
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect metrics body")
            .to_bytes();
        String::from_utf8(body_bytes.to_vec()).expect("utf-8 metrics body")
    }

    #[test]
    fn records_successful_command_metrics() {
        let cmd = "test_command_metrics_success";

        record_command_start(cmd);
        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 1);

        record_command_result(cmd, Duration::from_millis(120), true);

        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 0);
        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "ok"]).get(), 1);
        assert_eq!(
            COMMAND_DURATION
                .with_label_values(&[cmd])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn records_failed_command_metrics() {
        let cmd = "test_command_metrics_error";

        record_command_start(cmd);
        record_command_result(cmd, Duration::from_secs(2), false);

        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "error"]).get(), 1);
    }

    #[test]
    fn parsed_messages_are_counted_per_platform() {
        init_collectors();
        let before = PARSED_MESSAGES.with_label_values(&["instagram"]).get();

        record_parsed_messages(Platform::Instagram, 42);

        assert_eq!(
            PARSED_MESSAGES.with_label_values(&["instagram"]).get(),
            before + 42
        );
    }

    #[test]
    fn temperature_observations_accumulate() {
        init_collectors();
        let before = TEMPERATURE.get_sample_count();

        observe_temperature(72);
        observe_temperature(100);

        assert_eq!(TEMPERATURE.get_sample_count(), before + 2);
    }

    #[test]
    fn narrative_outcomes_split_by_label() {
        init_collectors();
        record_narrative("test_situation", true);
        record_narrative("test_situation", false);
        record_narrative("test_situation", false);

        assert_eq!(
            NARRATIVE_TOTAL
                .with_label_values(&["test_situation", "fallback"])
                .get(),
            1
        );
        assert_eq!(
            NARRATIVE_TOTAL
                .with_label_values(&["test_situation", "ok"])
                .get(),
            2
        );
    }

    #[tokio::test]
    async fn metrics_response_contains_registered_metrics() {
        let cmd = "test_metrics_response";
        record_command_start(cmd);
        record_command_result(cmd, Duration::from_millis(10), true);
        observe_temperature(55);

        let text = scrape().await;
        assert!(text.contains("chat_temperature_command_total"));
        assert!(text.contains("chat_temperature_score"));
        assert!(text.contains(cmd));
    }

    #[tokio::test]
    async fn metrics_response_has_text_content_type() {
        let response = metrics_response().await.expect("metrics response");

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/"));
    }
}
