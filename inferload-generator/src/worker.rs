use inferload_client::AggregatorClient;
use inferload_common::{ReportAck, Result};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{REQUEST_INTERVAL, TEST_DURATION};
use crate::infer::InferenceBackend;
use crate::metrics::Metrics;
use crate::payload::PayloadSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// No new request starts once this much time has passed since the run began.
    pub duration: Duration,
    /// Sleep after every call, including the last one.
    pub interval: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { duration: TEST_DURATION, interval: REQUEST_INTERVAL }
    }
}

/// Drive `backend` with fresh payloads for `settings.duration`, one call at a time.
/// Failed calls still contribute their time-to-error as a latency sample.
pub async fn run<B, R>(backend: &B, spec: &PayloadSpec, settings: RunSettings, rng: &mut R) -> Metrics
where
    B: InferenceBackend + ?Sized,
    R: Rng,
{
    let mut latency_ms: Vec<f64> = Vec::new();
    let mut errors: u64 = 0;

    let run_start = Instant::now();

    while run_start.elapsed() < settings.duration {
        let request = spec.build(rng);

        let call_start = Instant::now();
        let outcome = backend.infer(&request).await;
        let latency = call_start.elapsed().as_secs_f64() * 1000.0;

        latency_ms.push(latency);
        match outcome {
            Ok(response) => debug!(latency_ms = latency, model = %response.model_name, "inference completed"),
            Err(e) => {
                errors += 1;
                warn!(latency_ms = latency, error = %e, "inference failed");
            }
        }

        tokio::time::sleep(settings.interval).await;
    }

    let elapsed_secs = run_start.elapsed().as_secs_f64();
    Metrics { latency_ms, errors, elapsed_secs }
}

/// Summarise `metrics` and send the result to the aggregator exactly once.
/// An empty run is reported as `NoSamples` and nothing is sent.
pub async fn report(client: &AggregatorClient, replica_id: Option<String>, metrics: &Metrics) -> Result<ReportAck> {
    let report = metrics.summary()?.into_report(replica_id);
    client.submit_report(&report).await
}
