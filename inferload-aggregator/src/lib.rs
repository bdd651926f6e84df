use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use inferload_common::{ErrorResponse, FinalStats, PendingStatus, ReplicaReport, ReportAck, StatsResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

pub mod config;
pub mod stats;
use config::LOCK_TIMEOUT;

/// Why a report was refused. Refused reports never touch the aggregate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestRejection {
    #[error("All {0} expected reports have already been received")]
    AlreadyComplete(usize),

    #[error("Replica {0} has already reported")]
    DuplicateReplica(String),
}

/// Reports collected so far plus the cached final statistics.
///
/// `final_stats` is populated by the same `ingest` call that brings the report
/// count up to `expected_replicas`, and is never cleared afterwards.
#[derive(Debug)]
pub struct AggregateState {
    pub expected_replicas: usize,
    pub reports: Vec<ReplicaReport>,
    pub final_stats: Option<FinalStats>,
}

impl AggregateState {
    /// `expected_replicas` is raised to at least 1; a zero target could never complete.
    pub fn new(expected_replicas: usize) -> Self {
        let expected_replicas = expected_replicas.max(1);
        Self {
            expected_replicas,
            reports: Vec::with_capacity(expected_replicas),
            final_stats: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.final_stats.is_some()
    }

    /// Append one report. Excess reports and repeated replica ids are rejected.
    pub fn ingest(&mut self, report: ReplicaReport) -> Result<ReportAck, IngestRejection> {
        if self.reports.len() >= self.expected_replicas {
            return Err(IngestRejection::AlreadyComplete(self.expected_replicas));
        }
        if let Some(id) = report.replica_id.as_deref() {
            if self.reports.iter().any(|r| r.replica_id.as_deref() == Some(id)) {
                return Err(IngestRejection::DuplicateReplica(id.to_string()));
            }
        }

        self.reports.push(report);
        if self.reports.len() == self.expected_replicas {
            self.final_stats = stats::compute_final_stats(&self.reports);
        }

        Ok(ReportAck {
            accepted: self.reports.len(),
            expected: self.expected_replicas,
            complete: self.is_complete(),
        })
    }

    pub fn stats_response(&self) -> StatsResponse {
        match &self.final_stats {
            Some(stats) => StatsResponse::Complete(stats.clone()),
            None => StatsResponse::Pending(PendingStatus::new(self.reports.len(), self.expected_replicas)),
        }
    }
}

pub type Aggregate = Arc<Mutex<AggregateState>>;

#[derive(Clone)]
pub struct AppState {
    pub aggregate: Aggregate,
}

impl AppState {
    pub fn new(expected_replicas: usize) -> Self {
        Self {
            aggregate: Arc::new(Mutex::new(AggregateState::new(expected_replicas))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Treated as 1 when zero.
    pub expected_replicas: usize,
}

/// InferLoad aggregator server
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(mut config: ServerConfig) -> Self {
        config.expected_replicas = config.expected_replicas.max(1);
        Self { config }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    pub fn expected_replicas(&self) -> usize {
        self.config.expected_replicas
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/report", post(handle_report))
            .route("/stats", get(handle_stats))
            .route("/health", get(handle_health))
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let state = AppState::new(self.config.expected_replicas);
        let app = Self::create_router(state);
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, expected_replicas = self.config.expected_replicas, "aggregator listening");
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

fn lock_timeout_response() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Server error: Lock acquisition timed out")
}

/// Handler for POST /report: records one replica report.
///
/// Returns 400 for bodies that are not a well-formed report, 409 once every
/// expected report has arrived or when the replica id was already seen.
pub async fn handle_report(State(state): State<AppState>, body: Bytes) -> Response {
    let report: ReplicaReport = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid report: {}", e)),
    };
    if let Some(field) = report.invalid_field() {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid report: {} must be a non-negative number", field),
        );
    }

    let mut aggregate = match timeout(LOCK_TIMEOUT, state.aggregate.lock()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };

    let replica = report.replica_id.clone().unwrap_or_else(|| "<anonymous>".to_string());
    match aggregate.ingest(report) {
        Ok(ack) => {
            info!(%replica, accepted = ack.accepted, expected = ack.expected, "report received");
            // Only the report that completes the set sees `complete` here.
            if let (true, Some(stats)) = (ack.complete, aggregate.final_stats.as_ref()) {
                info!(
                    total_replicas = stats.total_replicas,
                    overall_average = stats.overall_average,
                    overall_p50 = stats.overall_p50,
                    overall_p95 = stats.overall_p95,
                    "all replicas reported; final statistics computed"
                );
            }
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(rejection) => {
            warn!(%replica, %rejection, "report rejected");
            error_response(StatusCode::CONFLICT, rejection.to_string())
        }
    }
}

/// Handler for GET /stats: final statistics once every replica reported, pending status before.
pub async fn handle_stats(State(state): State<AppState>) -> Response {
    let aggregate = match timeout(LOCK_TIMEOUT, state.aggregate.lock()).await {
        Ok(guard) => guard,
        Err(_) => return lock_timeout_response(),
    };
    (StatusCode::OK, Json(aggregate.stats_response())).into_response()
}

pub async fn handle_health() -> &'static str {
    "ok"
}
