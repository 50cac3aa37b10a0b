//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (sessions by status, documents) are
//! updated on each `/metrics` scrape (pull model) — see the metrics
//! handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    sessions_total: GaugeVec,
    sessions_active: Gauge,
    documents_total: Gauge,
    documents_signed: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("firma_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "firma_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("firma_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let sessions_total = GaugeVec::new(
            Opts::new("firma_signing_sessions_total", "Signing sessions by status"),
            &["status"],
        )
        .expect("metric can be created");

        let sessions_active = Gauge::new(
            "firma_signing_sessions_active",
            "Documents with a non-terminal signing session",
        )
        .expect("metric can be created");

        let documents_total =
            Gauge::new("firma_documents_total", "Registered documents").expect("metric can be created");

        let documents_signed =
            Gauge::new("firma_documents_signed", "Documents marked signed").expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(sessions_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(sessions_active.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(documents_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(documents_signed.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                sessions_total,
                sessions_active,
                documents_total,
                documents_signed,
            }),
        }
    }

    /// Sessions-by-status gauge, updated on scrape.
    pub fn sessions_total(&self) -> &GaugeVec {
        &self.inner.sessions_total
    }

    /// Active-sessions gauge, updated on scrape.
    pub fn sessions_active(&self) -> &Gauge {
        &self.inner.sessions_active
    }

    /// Registered-documents gauge, updated on scrape.
    pub fn documents_total(&self) -> &Gauge {
        &self.inner.documents_total
    }

    /// Signed-documents gauge, updated on scrape.
    pub fn documents_signed(&self) -> &Gauge {
        &self.inner.documents_signed
    }

    /// Record one completed HTTP request.
    fn record_http(&self, method: &str, path: &str, status: u16, elapsed_secs: f64) {
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(elapsed_secs);
        if status.starts_with('4') || status.starts_with('5') {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, status.as_str()])
                .inc();
        }
    }

    /// Gather and encode all metrics in Prometheus text exposition format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum middleware recording request count, latency, and error count.
///
/// Uses the matched route pattern (`/v1/signing-sessions/:document_id/...`)
/// as the path label to keep cardinality bounded.
pub async fn metrics_middleware(
    axum::Extension(metrics): axum::Extension<ApiMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    metrics.record_http(&method, &path, response.status().as_u16(), elapsed);
    response
}
