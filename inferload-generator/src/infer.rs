use inferload_common::{ErrorResponse, InferLoadError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;

use crate::payload::InferRequest;

/// Output tensor metadata. Tensor contents are not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferOutput {
    pub name: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub shape: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferResponse {
    pub model_name: String,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub outputs: Vec<InferOutput>,
}

pub type InferFuture<'a> = Pin<Box<dyn Future<Output = Result<InferResponse>> + Send + 'a>>;

/// Something that can serve one inference call. Only whether and when it
/// completes matters to the load loop.
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn infer<'a>(&'a self, request: &'a InferRequest) -> InferFuture<'a>;
}

/// Backend that answers every call after a fixed delay, without any network I/O.
/// With `fail_every = Some(n)`, every n-th call fails instead.
pub struct MockBackend {
    delay: Duration,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl MockBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay, fail_every: None, calls: AtomicU64::new(0) }
    }

    pub fn failing_every(delay: Duration, n: u64) -> Self {
        Self { fail_every: Some(n.max(1)), ..Self::new(delay) }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl InferenceBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn infer<'a>(&'a self, request: &'a InferRequest) -> InferFuture<'a> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            sleep(self.delay).await;
            if matches!(self.fail_every, Some(n) if call % n == 0) {
                return Err(InferLoadError::HttpError(503, format!("mock failure on call {}", call)));
            }
            Ok(InferResponse {
                model_name: request.model_name.clone(),
                model_version: request.model_version.clone(),
                outputs: Vec::new(),
            })
        })
    }
}

/// Client for the KServe v2 HTTP inference protocol (as served by Triton).
pub struct KServeHttpBackend {
    base_url: String,
    timeout: Option<Duration>,
    http_client: reqwest::Client,
}

impl KServeHttpBackend {
    /// `timeout` bounds each call; `None` lets a hung call block indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http_client = builder
            .build()
            .map_err(|e| InferLoadError::NetworkError(e.to_string()))?;
        Ok(Self { base_url: base_url.into(), timeout, http_client })
    }

    /// `{base}/v2/models/{model}[/versions/{version}]/infer`
    pub fn infer_url(&self, request: &InferRequest) -> String {
        let base = self.base_url.trim_end_matches('/');
        match request.model_version.as_deref().filter(|v| !v.is_empty()) {
            Some(version) => format!("{}/v2/models/{}/versions/{}/infer", base, request.model_name, version),
            None => format!("{}/v2/models/{}/infer", base, request.model_name),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferLoadError {
        match self.timeout {
            Some(t) if e.is_timeout() => InferLoadError::Timeout(t.as_millis() as u64),
            _ => InferLoadError::NetworkError(e.to_string()),
        }
    }
}

impl InferenceBackend for KServeHttpBackend {
    fn name(&self) -> &'static str {
        "kserve-http"
    }

    fn infer<'a>(&'a self, request: &'a InferRequest) -> InferFuture<'a> {
        Box::pin(async move {
            let response = self
                .http_client
                .post(self.infer_url(request))
                .json(request)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = response.status();
            if !status.is_success() {
                // KServe servers report failures as `{"error": "..."}`.
                let error_msg = response
                    .json::<ErrorResponse>()
                    .await
                    .map(|r| r.error)
                    .unwrap_or_else(|_| format!("Server returned status: {}", status));
                return Err(InferLoadError::HttpError(status.as_u16(), error_msg));
            }

            response
                .json::<InferResponse>()
                .await
                .map_err(|e| InferLoadError::InvalidResponse(e.to_string()))
        })
    }
}
