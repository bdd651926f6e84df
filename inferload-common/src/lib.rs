use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for InferLoad operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferLoadError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("No latency samples were recorded")]
    NoSamples,
}

/// JSON error envelope returned by the aggregator for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Summary a single replica sends once, at the end of its run. Latencies are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_id: Option<String>,
    pub average_latency: f64,
    pub p50: f64,
    pub p95: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<f64>,
}

impl ReplicaReport {
    /// Returns the name of the first latency field that is negative or not finite.
    /// Absent optional fields are not checked.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("averageLatency", self.average_latency),
            ("p50", self.p50),
            ("p95", self.p95),
        ]
        .into_iter()
        .chain(
            [("minLatency", self.min_latency), ("maxLatency", self.max_latency)]
                .into_iter()
                .filter_map(|(name, v)| v.map(|v| (name, v))),
        )
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
        .map(|(name, _)| name)
    }
}

/// Combined statistics over every replica's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStats {
    pub total_replicas: usize,
    pub overall_average: f64,
    pub overall_p50: f64,
    pub overall_p95: f64,
    /// Individual reports in arrival order.
    pub replica_results: Vec<ReplicaReport>,
}

pub const PENDING_STATUS: &str = "pending";

/// Returned by `GET /stats` while reports are still outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatus {
    pub status: String,
    pub message: String,
    pub completed: usize,
    pub expected: usize,
}

impl PendingStatus {
    pub fn new(completed: usize, expected: usize) -> Self {
        Self {
            status: PENDING_STATUS.to_string(),
            message: format!("Not all replicas have reported yet ({}/{})", completed, expected),
            completed,
            expected,
        }
    }
}

/// Body of `GET /stats`: final statistics once complete, a pending status before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Complete(FinalStats),
    Pending(PendingStatus),
}

impl StatsResponse {
    pub fn is_complete(&self) -> bool {
        matches!(self, StatsResponse::Complete(_))
    }
}

/// Body of a successful `POST /report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAck {
    pub accepted: usize,
    pub expected: usize,
    pub complete: bool,
}

/// Result type for InferLoad operations
pub type Result<T> = std::result::Result<T, InferLoadError>;
