//! Prometheus metrics and the probe/metrics HTTP endpoint.

use crate::error::ControllerError;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use crds::ClusterSyncStatus;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Default bind address of the metrics endpoint.
pub const DEFAULT_METRICS_BIND_ADDR: &str = "0.0.0.0:8080";

/// Node config write performed by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeConfigOperation {
    Create,
    Update,
    Delete,
}

impl NodeConfigOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeConfigOperation::Create => "create",
            NodeConfigOperation::Update => "update",
            NodeConfigOperation::Delete => "delete",
        }
    }
}

/// Counters exported by the controller.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    reconcile_total: IntCounterVec,
    node_config_operations_total: IntCounterVec,
}

impl Metrics {
    /// Creates the counters and registers them in a fresh registry.
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconcile_total = IntCounterVec::new(
            Opts::new("sriov_fec_reconcile_total", "SriovFecClusterConfig reconciliation passes by resulting sync status"),
            &["sync_status"],
        )?;
        let node_config_operations_total = IntCounterVec::new(
            Opts::new("sriov_fec_node_config_operations_total", "SriovFecNodeConfig writes by operation"),
            &["operation"],
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(node_config_operations_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            reconcile_total,
            node_config_operations_total,
        })
    }

    pub fn record_reconcile(&self, sync_status: ClusterSyncStatus) {
        self.reconcile_total.with_label_values(&[sync_status.as_str()]).inc();
    }

    pub fn record_node_config_operation(&self, operation: NodeConfigOperation) {
        self.node_config_operations_total
            .with_label_values(&[operation.as_str()])
            .inc();
    }

    pub fn reconcile_count(&self, sync_status: ClusterSyncStatus) -> u64 {
        self.reconcile_total.with_label_values(&[sync_status.as_str()]).get()
    }

    pub fn node_config_operation_count(&self, operation: NodeConfigOperation) -> u64 {
        self.node_config_operations_total
            .with_label_values(&[operation.as_str()])
            .get()
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, ControllerError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ControllerError::Metrics(format!("metrics are not UTF-8: {}", e)))
    }
}

/// Serves `/metrics` and `/healthz` until the listener fails.
pub async fn serve(metrics: Metrics, bind_addr: SocketAddr) -> Result<(), ControllerError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ControllerError::Metrics(format!("failed to bind {}: {}", bind_addr, e)))?;

    info!("Starting metrics endpoint on {}", bind_addr);
    axum::serve(listener, create_app(metrics))
        .await
        .map_err(|e| ControllerError::Metrics(format!("metrics endpoint failed: {}", e)))
}

fn create_app(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Metrics>) -> Response {
    match metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to export metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export metrics").into_response()
        }
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}
