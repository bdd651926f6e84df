use clap::Parser;
use inferload_aggregator::config::{DEFAULT_EXPECTED_REPLICAS, DEFAULT_PORT};
use inferload_aggregator::{Server, ServerConfig};
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "inferload-aggregator", about = "Collects replica latency reports and combines them")]
struct Args {
    /// Number of replica reports to wait for before computing final statistics.
    #[arg(
        long,
        env = "EXPECTED_REPLICAS",
        default_value_t = DEFAULT_EXPECTED_REPLICAS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    expected_replicas: u64,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        address: SocketAddr::new(args.host, args.port),
        expected_replicas: args.expected_replicas as usize,
    };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(config).run(ready_tx).await?;
    Ok(())
}
