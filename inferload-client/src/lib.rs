use inferload_common::{ErrorResponse, InferLoadError, ReplicaReport, ReportAck, Result, StatsResponse};

/// Aggregator client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the aggregator, e.g. `http://aggregator:3000`.
    pub base_url: String,
}

/// Client for the aggregator's report and stats endpoints
pub struct AggregatorClient {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl AggregatorClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the URL for an aggregator endpoint path such as `report` or `stats`.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Submit this replica's report. Sent exactly once; there is no retry.
    pub async fn submit_report(&self, report: &ReplicaReport) -> Result<ReportAck> {
        let response = self
            .http_client
            .post(self.build_url("report"))
            .json(report)
            .send()
            .await
            .map_err(|e| InferLoadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        response
            .json::<ReportAck>()
            .await
            .map_err(|e| InferLoadError::InvalidResponse(e.to_string()))
    }

    /// Fetch the aggregator's current view: pending counts or the final statistics.
    pub async fn get_stats(&self) -> Result<StatsResponse> {
        let response = self
            .http_client
            .get(self.build_url("stats"))
            .send()
            .await
            .map_err(|e| InferLoadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        response
            .json::<StatsResponse>()
            .await
            .map_err(|e| InferLoadError::InvalidResponse(e.to_string()))
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> InferLoadError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    InferLoadError::HttpError(status.as_u16(), error_msg)
}
