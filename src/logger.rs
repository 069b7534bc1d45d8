use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use anyhow::{Context as _, Result};
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::trace::{FutureExt, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Context, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, MetricExporter, Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::{logs::SdkLoggerProvider, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

const SERVICE_NAME: &str = "flowdocs";

/// Target of the one-line JSON event written per request.
pub const REQUEST_TARGET: &str = "request";

/// Keeps exporters alive for the life of the process and flushes them on
/// drop.
pub struct TelemetryGuard {
    otel: Option<Telemetry>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(telemetry) = self.otel.take() {
            telemetry.shutdown();
        }
    }
}

/// Install the global subscriber.
///
/// Without an endpoint everything goes to daily-rotated files under `root`:
/// `log_file` gets plain text, `event_file` gets the JSON request events.
/// With an endpoint, logs, traces and metrics are exported over OTLP/HTTP
/// and a copy of the log is printed to stderr. Nothing is ever written to
/// stdout.
pub fn init_tracing(
    root: PathBuf,
    log_file: String,
    event_file: String,
    log_level: String,
    otel_endpoint: Option<String>,
) -> Result<TelemetryGuard> {
    match otel_endpoint {
        Some(endpoint) => {
            let telemetry = Telemetry::init(&log_level, &endpoint)?;
            Ok(TelemetryGuard { otel: Some(telemetry) })
        }
        None => {
            init_files(&log_level, &root.join(log_file), &root.join(event_file))?;
            Ok(TelemetryGuard { otel: None })
        }
    }
}

fn rolling(path: &Path) -> Result<RollingFileAppender> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = anyhow::Context::with_context(
        path.file_name().map(|n| n.to_string_lossy().into_owned()),
        || format!("log path {} has no file name", path.display()),
    )?;
    anyhow::Context::with_context(
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(name)
            .build(dir),
        || format!("failed to open log file in {}", dir.display()),
    )
}

fn init_files(log_level: &str, log_file: &Path, event_file: &Path) -> Result<()> {
    let txt_layer = fmt::layer()
        .with_writer(rolling(log_file)?)
        .with_ansi(false)
        .with_filter(EnvFilter::new(log_level));

    let json_layer = fmt::layer()
        .json()
        .with_writer(rolling(event_file)?)
        .with_target(true)
        .with_filter(EnvFilter::new(format!("{REQUEST_TARGET}=info")));

    Registry::default()
        .with(txt_layer)
        .with(json_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")
}

static RESOURCE: OnceLock<Resource> = OnceLock::new();

fn resource() -> Resource {
    RESOURCE
        .get_or_init(|| Resource::builder().with_service_name(SERVICE_NAME).build())
        .clone()
}

fn init_logs(endpoint: &str) -> Result<SdkLoggerProvider> {
    let exporter = LogExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .build()
        .context("log exporter")?;
    Ok(SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource())
        .build())
}

fn init_traces(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .build()
        .context("span exporter")?;
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource())
        .build())
}

fn init_metrics(endpoint: &str) -> Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .build()
        .context("metric exporter")?;
    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(resource())
        .build())
}

/// The three OTLP providers, registered globally once initialised.
pub struct Telemetry {
    pub logger_provider: SdkLoggerProvider,
    pub tracer_provider: SdkTracerProvider,
    pub meter_provider: SdkMeterProvider,
}

impl Telemetry {
    pub fn init(log_level: &str, endpoint: &str) -> Result<Self> {
        let logger_provider = init_logs(endpoint)?;
        let tracer_provider = init_traces(endpoint)?;
        let meter_provider = init_metrics(endpoint)?;

        // exporter internals would otherwise log about their own exports
        let bridge_filter = EnvFilter::new(log_level)
            .add_directive("hyper=off".parse()?)
            .add_directive("h2=off".parse()?)
            .add_directive("reqwest=off".parse()?);
        let otel_layer = OpenTelemetryTracingBridge::new(&logger_provider).with_filter(bridge_filter);

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_filter(EnvFilter::new(log_level));

        Registry::default()
            .with(otel_layer)
            .with(fmt_layer)
            .try_init()
            .context("a global tracing subscriber is already installed")?;

        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        Ok(Telemetry {
            logger_provider,
            tracer_provider,
            meter_provider,
        })
    }

    fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("tracer shutdown failed: {e}");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("meter shutdown failed: {e}");
        }
        if let Err(e) = self.logger_provider.shutdown() {
            eprintln!("logger shutdown failed: {e}");
        }
    }
}

/// Request counters and a latency histogram on the global meter. They are
/// no-ops unless an OTLP meter provider has been installed.
#[derive(Clone)]
pub struct RequestMetrics {
    requests_started: Counter<u64>,
    requests_succeeded: Counter<u64>,
    requests_failed: Counter<u64>,
    request_latency_ms: Histogram<f64>,
}

impl std::fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestMetrics")
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics {
    pub fn new() -> Self {
        let meter = global::meter(SERVICE_NAME);
        RequestMetrics {
            requests_started: meter
                .u64_counter("requests_started")
                .with_description("Total requests started")
                .build(),
            requests_succeeded: meter.u64_counter("requests_succeeded").build(),
            requests_failed: meter.u64_counter("requests_failed").build(),
            request_latency_ms: meter
                .f64_histogram("request_latency_ms")
                .with_description("Latency per request in ms")
                .with_unit("ms")
                .build(),
        }
    }

    pub fn started(&self, name: &str) -> Instant {
        self.requests_started
            .add(1, &[KeyValue::new("request", name.to_string())]);
        Instant::now()
    }

    /// Record the outcome of a request begun at `start` and emit its JSON
    /// event line.
    pub fn record(&self, name: &str, start: Instant, status: &str, ok: bool) {
        let elapsed = start.elapsed().as_secs_f64() * 1_000.0;
        let attrs = [KeyValue::new("request", name.to_string())];
        self.request_latency_ms.record(elapsed, &attrs);
        if ok {
            self.requests_succeeded.add(1, &attrs);
        } else {
            self.requests_failed.add(1, &attrs);
        }
        tracing::event!(
            target: REQUEST_TARGET,
            tracing::Level::INFO,
            request = name,
            latency_ms = elapsed,
            status,
        );
    }

    /// Run `fut` inside a span named `name`, recording metrics and one
    /// request event for its outcome.
    pub async fn instrument_request<Fut, T, E>(&self, name: &str, fut: Fut) -> std::result::Result<T, E>
    where
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let start = self.started(name);
        let span = global::tracer_provider()
            .tracer(SERVICE_NAME)
            .start(name.to_string());
        let cx = Context::current_with_span(span);
        let result = fut.with_context(cx).await;

        match &result {
            Ok(_) => {
                info!(request = name, "request succeeded");
                self.record(name, start, "ok", true);
            }
            Err(err) => {
                error!(request = name, error = %err, "request failed");
                self.record(name, start, "error", false);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instrumenting_passes_results_through() {
        let metrics = RequestMetrics::new();
        let ok: std::result::Result<u8, String> = metrics.instrument_request("ok", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));
        let err: std::result::Result<u8, String> = metrics
            .instrument_request("bad", async { Err("boom".to_string()) })
            .await;
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn file_logging_rejects_bare_roots() {
        assert!(rolling(Path::new("/")).is_err());
    }
}
