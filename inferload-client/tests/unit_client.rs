use inferload_client::{AggregatorClient, ClientConfig};
use inferload_common::{InferLoadError, ReplicaReport, StatsResponse};

fn client_for(server_url: &str) -> AggregatorClient {
    AggregatorClient::new(ClientConfig { base_url: server_url.to_string() })
}

fn sample_report() -> ReplicaReport {
    ReplicaReport {
        replica_id: Some("gen-1".to_string()),
        average_latency: 100.0,
        p50: 95.0,
        p95: 180.0,
        request_count: Some(20),
        error_count: Some(1),
        min_latency: Some(40.0),
        max_latency: Some(300.0),
    }
}

#[test]
fn test_client_creation_with_config() {
    let client = client_for("http://aggregator:3000");
    assert_eq!(client.config.base_url, "http://aggregator:3000");
}

#[test]
fn test_build_url() {
    let client = client_for("http://127.0.0.1:3000");
    assert_eq!(client.build_url("report"), "http://127.0.0.1:3000/report");
    assert_eq!(client.build_url("stats"), "http://127.0.0.1:3000/stats");
}

#[test]
fn test_build_url_trailing_slash() {
    let client = client_for("http://127.0.0.1:3000/");
    assert_eq!(client.build_url("report"), "http://127.0.0.1:3000/report");
}

// --- submit_report ---

#[tokio::test]
async fn test_submit_report_posts_camel_case_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/report")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"replicaId":"gen-1","averageLatency":100.0,"p50":95.0,"p95":180.0}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accepted":1,"expected":2,"complete":false}"#)
        .create_async()
        .await;

    let ack = client_for(&server.url()).submit_report(&sample_report()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(ack.accepted, 1);
    assert_eq!(ack.expected, 2);
    assert!(!ack.complete);
}

#[tokio::test]
async fn test_submit_report_conflict_carries_server_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/report")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"All 2 expected reports have already been received"}"#)
        .create_async()
        .await;

    let result = client_for(&server.url()).submit_report(&sample_report()).await;

    assert!(matches!(
        result,
        Err(InferLoadError::HttpError(409, msg)) if msg.contains("already been received")
    ));
}

#[tokio::test]
async fn test_submit_report_http_error_without_json_body() {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/report").with_status(500).create_async().await;

    let result = client_for(&server.url()).submit_report(&sample_report()).await;

    assert!(matches!(result, Err(InferLoadError::HttpError(500, _))));
}

#[tokio::test]
async fn test_submit_report_network_error() {
    // Port 1 on localhost is not listening.
    let result = client_for("http://127.0.0.1:1").submit_report(&sample_report()).await;
    assert!(matches!(result, Err(InferLoadError::NetworkError(_))));
}

#[tokio::test]
async fn test_submit_report_invalid_ack_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/report")
        .with_status(200)
        .with_body("Latency recorded")
        .create_async()
        .await;

    let result = client_for(&server.url()).submit_report(&sample_report()).await;

    assert!(matches!(result, Err(InferLoadError::InvalidResponse(_))));
}

// --- get_stats ---

#[tokio::test]
async fn test_get_stats_pending() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/stats")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"pending","message":"Not all replicas have reported yet (1/2)","completed":1,"expected":2}"#)
        .create_async()
        .await;

    let stats = client_for(&server.url()).get_stats().await.unwrap();

    match stats {
        StatsResponse::Pending(p) => assert_eq!((p.completed, p.expected), (1, 2)),
        other => panic!("expected pending, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_stats_complete() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
        "totalReplicas": 2,
        "overallAverage": 110.0,
        "overallP50": 95.0,
        "overallP95": 200.0,
        "replicaResults": [
            {"replicaId": "A", "averageLatency": 100.0, "p50": 95.0, "p95": 180.0},
            {"replicaId": "B", "averageLatency": 120.0, "p50": 105.0, "p95": 200.0}
        ]
    });
    server
        .mock("GET", "/stats")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let stats = client_for(&server.url()).get_stats().await.unwrap();

    match stats {
        StatsResponse::Complete(s) => {
            assert_eq!(s.total_replicas, 2);
            assert_eq!(s.overall_average, 110.0);
            assert_eq!(s.overall_p95, 200.0);
            assert_eq!(s.replica_results[1].replica_id.as_deref(), Some("B"));
        }
        other => panic!("expected final stats, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_stats_returns_http_error_on_503() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/stats")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Server error: Lock acquisition timed out"}"#)
        .create_async()
        .await;

    let result = client_for(&server.url()).get_stats().await;

    assert!(matches!(
        result,
        Err(InferLoadError::HttpError(503, msg)) if msg == "Server error: Lock acquisition timed out"
    ));
}
