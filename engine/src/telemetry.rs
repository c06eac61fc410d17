use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Pipeline metrics
    pub static ref LAUNCHES_DETECTED_TOTAL: Counter = Counter::new(
        "launches_detected_total",
        "Launch signatures accepted from the log subscription"
    ).unwrap();

    pub static ref LAUNCHES_SKIPPED_TOTAL: Counter = Counter::new(
        "launches_skipped_total",
        "Notifications skipped (errored transaction or not a launch)"
    ).unwrap();

    pub static ref RECORDS_DELIVERED_TOTAL: Counter = Counter::new(
        "records_delivered_total",
        "Analysis records handed to the persistence sink"
    ).unwrap();

    pub static ref BRANCH_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "enrichment_branch_failures_total",
            "Enrichment branches that failed and were substituted with defaults"
        ),
        &["branch"]
    ).unwrap();

    // Health metrics
    pub static ref WEBSOCKET_RECONNECTS_TOTAL: Counter = Counter::new(
        "websocket_reconnects_total",
        "Times the log subscription had to reconnect"
    ).unwrap();

    pub static ref RPC_ERRORS_TOTAL: Counter = Counter::new(
        "rpc_errors_total",
        "Total RPC errors encountered"
    ).unwrap();

    pub static ref EVENTS_IN_FLIGHT: IntGauge = IntGauge::new(
        "events_in_flight",
        "Launch events currently being enriched"
    ).unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(LAUNCHES_DETECTED_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(LAUNCHES_SKIPPED_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(RECORDS_DELIVERED_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(BRANCH_FAILURES_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(WEBSOCKET_RECONNECTS_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(RPC_ERRORS_TOTAL.clone())).unwrap();
    REGISTRY.register(Box::new(EVENTS_IN_FLIGHT.clone())).unwrap();
}

async fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Serve Prometheus metrics over HTTP
pub async fn serve_metrics(addr: String) {
    let app = axum::Router::new().route("/metrics", axum::routing::get(render_metrics));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind metrics address {}: {}", addr, e);
            return;
        }
    };

    tracing::info!("📊 Prometheus metrics server on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Metrics server terminated: {}", e);
    }
}
