//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Submission attempts and outcomes
//! - Failures by stage and broadcast rejections by result code
//! - Account sequence tracking

use crate::config::MetricsConfig;
use crate::error::{ClientError, ClientResult, SubmitError};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

lazy_static! {
    // Submission metrics
    pub static ref SUBMISSIONS_STARTED: CounterVec = register_counter_vec!(
        "wormchain_submissions_started_total",
        "Total submissions started",
        &["chain_id"]
    ).expect("metric can be registered");

    pub static ref SUBMISSIONS_SUCCEEDED: CounterVec = register_counter_vec!(
        "wormchain_submissions_succeeded_total",
        "Total submissions included in a block with a success code",
        &["chain_id"]
    ).expect("metric can be registered");

    pub static ref SUBMISSIONS_FAILED: CounterVec = register_counter_vec!(
        "wormchain_submissions_failed_total",
        "Total failed submissions by stage",
        &["chain_id", "stage"]
    ).expect("metric can be registered");

    pub static ref BROADCAST_REJECTED: CounterVec = register_counter_vec!(
        "wormchain_broadcast_rejected_total",
        "Total broadcasts rejected by the chain, by result code",
        &["chain_id", "code"]
    ).expect("metric can be registered");

    pub static ref SUBMISSION_LATENCY: HistogramVec = register_histogram_vec!(
        "wormchain_submission_latency_seconds",
        "Time from guard acquisition request to block inclusion",
        &["chain_id"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).expect("metric can be registered");

    // Account metrics
    pub static ref LAST_SIGNED_SEQUENCE: GaugeVec = register_gauge_vec!(
        "wormchain_last_signed_sequence",
        "Sequence of the last included transaction",
        &["chain_id"]
    ).expect("metric can be registered");

    pub static ref ACCOUNT_SEQUENCE: GaugeVec = register_gauge_vec!(
        "wormchain_account_sequence",
        "Account sequence reported by the last health check",
        &["chain_id"]
    ).expect("metric can be registered");

    // Health metrics
    pub static ref HEALTH_CHECK_SUCCESS: CounterVec = register_counter_vec!(
        "wormchain_health_check_success_total",
        "Total successful health checks",
        &["chain_id"]
    ).expect("metric can be registered");

    pub static ref HEALTH_CHECK_FAILURE: CounterVec = register_counter_vec!(
        "wormchain_health_check_failure_total",
        "Total failed health checks",
        &["chain_id"]
    ).expect("metric can be registered");
}

/// Identity reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct NodeIdentity {
    pub address: String,
    pub chain_id: String,
}

/// Prometheus metrics server
pub struct MetricsServer {
    config: MetricsConfig,
    identity: Arc<NodeIdentity>,
}

impl MetricsServer {
    pub fn new(config: MetricsConfig, identity: NodeIdentity) -> Self {
        Self {
            config,
            identity: Arc::new(identity),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.identity.clone())
    }

    pub async fn run(&self) -> ClientResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ClientError::Server(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ClientError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Render all registered metrics in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

async fn metrics_handler() -> impl IntoResponse {
    match render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn health_handler(State(identity): State<Arc<NodeIdentity>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        address: identity.address.clone(),
        chain_id: identity.chain_id.clone(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    address: String,
    chain_id: String,
}

// Helper functions to record metrics

pub fn record_submission_started(chain_id: &str) {
    SUBMISSIONS_STARTED.with_label_values(&[chain_id]).inc();
}

pub fn record_submission_succeeded(chain_id: &str, sequence: u64, latency_secs: f64) {
    SUBMISSIONS_SUCCEEDED.with_label_values(&[chain_id]).inc();
    SUBMISSION_LATENCY
        .with_label_values(&[chain_id])
        .observe(latency_secs);
    LAST_SIGNED_SEQUENCE
        .with_label_values(&[chain_id])
        .set(sequence as f64);
}

pub fn record_submission_failed(chain_id: &str, err: &SubmitError) {
    SUBMISSIONS_FAILED
        .with_label_values(&[chain_id, err.stage().as_str()])
        .inc();
    if let SubmitError::Broadcast { code, .. } = err {
        BROADCAST_REJECTED
            .with_label_values(&[chain_id, &code.to_string()])
            .inc();
    }
}

pub fn record_account_sequence(chain_id: &str, sequence: u64) {
    ACCOUNT_SEQUENCE
        .with_label_values(&[chain_id])
        .set(sequence as f64);
    HEALTH_CHECK_SUCCESS.with_label_values(&[chain_id]).inc();
}

pub fn record_health_check_failure(chain_id: &str) {
    HEALTH_CHECK_FAILURE.with_label_values(&[chain_id]).inc();
}
