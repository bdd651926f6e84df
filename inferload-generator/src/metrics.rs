use inferload_common::{InferLoadError, ReplicaReport, Result};

pub struct Metrics {
    /// One entry per completed call, success or failure, in milliseconds (unsorted).
    pub latency_ms: Vec<f64>,
    pub errors: u64,
    pub elapsed_secs: f64,
}

/// Local statistics for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub requests: u64,
    pub errors: u64,
    pub average_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    pub fn into_report(self, replica_id: Option<String>) -> ReplicaReport {
        ReplicaReport {
            replica_id,
            average_latency: self.average_ms,
            p50: self.p50_ms,
            p95: self.p95_ms,
            request_count: Some(self.requests),
            error_count: Some(self.errors),
            min_latency: Some(self.min_ms),
            max_latency: Some(self.max_ms),
        }
    }
}

impl Metrics {
    pub fn requests_total(&self) -> u64 {
        self.latency_ms.len() as u64
    }

    pub fn average_ms(&self) -> Option<f64> {
        if self.latency_ms.is_empty() {
            return None;
        }
        Some(self.latency_ms.iter().sum::<f64>() / self.latency_ms.len() as f64)
    }

    pub fn p50_ms(&self) -> Option<f64> {
        percentile(&self.latency_ms, 50.0)
    }

    pub fn p95_ms(&self) -> Option<f64> {
        percentile(&self.latency_ms, 95.0)
    }

    pub fn min_ms(&self) -> Option<f64> {
        self.latency_ms.iter().copied().min_by(f64::total_cmp)
    }

    pub fn max_ms(&self) -> Option<f64> {
        self.latency_ms.iter().copied().max_by(f64::total_cmp)
    }

    pub fn error_rate(&self) -> f64 {
        if self.latency_ms.is_empty() {
            return 0.0;
        }
        self.errors as f64 / self.requests_total() as f64
    }

    pub fn throughput_rps(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.requests_total() as f64 / self.elapsed_secs
    }

    /// Summarise the run. A run without samples has no defined average and
    /// yields `NoSamples` instead of NaN.
    pub fn summary(&self) -> Result<LatencySummary> {
        let average_ms = self.average_ms().ok_or(InferLoadError::NoSamples)?;
        let mut sorted = self.latency_ms.clone();
        sorted.sort_by(f64::total_cmp);
        match (sorted.first(), sorted.last(), percentile(&sorted, 50.0), percentile(&sorted, 95.0)) {
            (Some(&min_ms), Some(&max_ms), Some(p50_ms), Some(p95_ms)) => Ok(LatencySummary {
                requests: self.requests_total(),
                errors: self.errors,
                average_ms,
                p50_ms,
                p95_ms,
                min_ms,
                max_ms,
            }),
            _ => Err(InferLoadError::NoSamples),
        }
    }
}

/// Sort `data` ascending and return the element at index `floor(p / 100 * n)`.
/// Returns `None` for an empty slice.
pub fn percentile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = (p / 100.0 * sorted.len() as f64).floor() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}
