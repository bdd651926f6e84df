use clap::{Parser, ValueEnum};
use inferload_client::{AggregatorClient, ClientConfig};
use inferload_common::InferLoadError;
use inferload_generator::config::{BATCH_SIZE, IMAGE_HEIGHT, IMAGE_WIDTH, MODEL_NAME, REQUEST_INTERVAL, TEST_DURATION};
use inferload_generator::infer::{InferenceBackend, KServeHttpBackend, MockBackend};
use inferload_generator::metrics::Metrics;
use inferload_generator::payload::PayloadSpec;
use inferload_generator::worker::{self, RunSettings};
use rand::{rngs::StdRng, SeedableRng};
use std::process;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// KServe v2 HTTP inference endpoint
    Kserve,
    /// In-process backend with a fixed simulated latency
    Mock,
}

#[derive(Parser, Debug)]
#[command(name = "inferload-generator", about = "Replica load generator for an inference endpoint")]
struct Args {
    /// Base URL of the inference server
    #[arg(long, env = "INFER_URL", default_value = "http://127.0.0.1:8000")]
    infer_url: String,

    /// Base URL of the aggregator that receives this replica's report
    #[arg(long, env = "AGGREGATOR_URL", default_value = "http://127.0.0.1:3000")]
    aggregator_url: String,

    /// Identifier included in the report (defaults to a random UUID)
    #[arg(long, env = "REPLICA_ID")]
    replica_id: Option<String>,

    #[arg(long, env = "MODEL_NAME", default_value = MODEL_NAME)]
    model: String,

    /// Model version; latest when omitted
    #[arg(long, env = "MODEL_VERSION")]
    model_version: Option<String>,

    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: usize,

    /// How long to run (seconds)
    #[arg(long, env = "TEST_DURATION", default_value_t = TEST_DURATION.as_secs())]
    duration: u64,

    /// Pause between requests (milliseconds)
    #[arg(long, default_value_t = REQUEST_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Per-call timeout in seconds; calls are unbounded when omitted
    #[arg(long)]
    infer_timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value = "kserve")]
    backend: Backend,

    /// Simulated latency for the mock backend (milliseconds)
    #[arg(long, default_value_t = 5)]
    mock_latency_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let replica_id = args
        .replica_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let backend: Box<dyn InferenceBackend> = match args.backend {
        Backend::Mock => Box::new(MockBackend::new(Duration::from_millis(args.mock_latency_ms))),
        Backend::Kserve => {
            let timeout = args.infer_timeout_secs.map(Duration::from_secs);
            match KServeHttpBackend::new(args.infer_url.clone(), timeout) {
                Ok(b) => Box::new(b),
                Err(e) => {
                    error!(error = %e, "failed to build inference client");
                    process::exit(3);
                }
            }
        }
    };

    let spec = PayloadSpec {
        model_name: args.model.clone(),
        model_version: args.model_version.clone(),
        batch_size: args.batch_size,
        height: IMAGE_HEIGHT,
        width: IMAGE_WIDTH,
    };
    let settings = RunSettings {
        duration: Duration::from_secs(args.duration),
        interval: Duration::from_millis(args.interval_ms),
    };

    info!(
        %replica_id,
        backend = backend.name(),
        target = %args.infer_url,
        model = %spec.model_name,
        shape = ?spec.shape(),
        duration_secs = args.duration,
        "starting load run"
    );

    let mut rng = StdRng::from_entropy();
    let metrics = worker::run(backend.as_ref(), &spec, settings, &mut rng).await;

    print_report(&args, &replica_id, &metrics);

    let client = AggregatorClient::new(ClientConfig { base_url: args.aggregator_url.clone() });
    let exit_code = match worker::report(&client, Some(replica_id), &metrics).await {
        Ok(ack) => {
            info!(accepted = ack.accepted, expected = ack.expected, complete = ack.complete, "report submitted");
            0
        }
        Err(InferLoadError::NoSamples) => {
            warn!("no data: the run finished without a single latency sample; nothing reported");
            2
        }
        Err(e) => {
            error!(error = %e, aggregator = %args.aggregator_url, "failed to submit report");
            1
        }
    };

    process::exit(exit_code);
}

fn print_report(args: &Args, replica_id: &str, metrics: &Metrics) {
    let fmt_ms = |v: Option<f64>| v.map(|ms| format!("{:.1} ms", ms)).unwrap_or_else(|| "n/a".to_string());

    println!("InferLoad Replica Results");
    println!("=========================");
    println!("Replica:               {}", replica_id);
    println!("Duration:              {:.1} s", metrics.elapsed_secs);
    println!("Model:                 {}", args.model);
    println!();
    println!("Requests:              {}", metrics.requests_total());
    println!("Errors:                {}", metrics.errors);
    println!("Error rate:            {:.3}%", metrics.error_rate() * 100.0);
    println!("Throughput:            {:.2} rps", metrics.throughput_rps());
    println!("Average latency:       {}", fmt_ms(metrics.average_ms()));
    println!("P50 latency:           {}", fmt_ms(metrics.p50_ms()));
    println!("P95 latency:           {}", fmt_ms(metrics.p95_ms()));
    println!("Min latency:           {}", fmt_ms(metrics.min_ms()));
    println!("Max latency:           {}", fmt_ms(metrics.max_ms()));
}
