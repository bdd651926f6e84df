use inferload_common::InferLoadError;
use inferload_generator::infer::{InferenceBackend, KServeHttpBackend, MockBackend};
use inferload_generator::payload::PayloadSpec;
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

fn tiny_request(version: Option<&str>) -> inferload_generator::payload::InferRequest {
    let spec = PayloadSpec {
        model_version: version.map(str::to_string),
        batch_size: 1,
        height: 2,
        width: 2,
        ..PayloadSpec::default()
    };
    spec.build(&mut StdRng::seed_from_u64(9))
}

#[test]
fn test_infer_url_latest_version() {
    let backend = KServeHttpBackend::new("http://triton:8000/", None).unwrap();
    assert_eq!(
        backend.infer_url(&tiny_request(None)),
        "http://triton:8000/v2/models/vitpose_ensemble/infer"
    );
    // An empty version string also means "latest".
    assert_eq!(
        backend.infer_url(&tiny_request(Some(""))),
        "http://triton:8000/v2/models/vitpose_ensemble/infer"
    );
}

#[test]
fn test_infer_url_pinned_version() {
    let backend = KServeHttpBackend::new("http://triton:8000", None).unwrap();
    assert_eq!(
        backend.infer_url(&tiny_request(Some("3"))),
        "http://triton:8000/v2/models/vitpose_ensemble/versions/3/infer"
    );
}

#[tokio::test]
async fn test_kserve_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/models/vitpose_ensemble/infer")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::Regex(r#""name":"input""#.to_string()),
            mockito::Matcher::Regex(r#""shape":\[1,3,2,2\]"#.to_string()),
            mockito::Matcher::Regex(r#""datatype":"FP32""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"model_name":"vitpose_ensemble","model_version":"1",
                "outputs":[{"name":"keypoints","datatype":"FP32","shape":[1,17,3],"data":[0.1,0.2]}]}"#,
        )
        .create_async()
        .await;

    let backend = KServeHttpBackend::new(server.url(), None).unwrap();
    let response = backend.infer(&tiny_request(None)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(backend.name(), "kserve-http");
    assert_eq!(response.model_name, "vitpose_ensemble");
    assert_eq!(response.model_version.as_deref(), Some("1"));
    assert_eq!(response.outputs[0].name, "keypoints");
    assert_eq!(response.outputs[0].shape, vec![1, 17, 3]);
}

#[tokio::test]
async fn test_kserve_error_message_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v2/models/vitpose_ensemble/infer")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"unexpected shape for input 'input'"}"#)
        .create_async()
        .await;

    let backend = KServeHttpBackend::new(server.url(), None).unwrap();
    let result = backend.infer(&tiny_request(None)).await;

    assert!(matches!(
        result,
        Err(InferLoadError::HttpError(400, msg)) if msg == "unexpected shape for input 'input'"
    ));
}

#[tokio::test]
async fn test_kserve_unparseable_success_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v2/models/vitpose_ensemble/infer")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let backend = KServeHttpBackend::new(server.url(), None).unwrap();
    let result = backend.infer(&tiny_request(None)).await;

    assert!(matches!(result, Err(InferLoadError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_kserve_network_error() {
    let backend = KServeHttpBackend::new("http://127.0.0.1:1", None).unwrap();
    let result = backend.infer(&tiny_request(None)).await;
    assert!(matches!(result, Err(InferLoadError::NetworkError(_))));
}

#[tokio::test]
async fn test_kserve_timeout_when_server_never_replies() {
    use tokio::io::AsyncReadExt;

    // Accepts the connection and drains the request, but never writes a response.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64 * 1024];
        while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
    });

    let backend = KServeHttpBackend::new(format!("http://{}", addr), Some(Duration::from_millis(50))).unwrap();
    let result = backend.infer(&tiny_request(None)).await;

    assert_eq!(result.map(|_| ()), Err(InferLoadError::Timeout(50)));
}

#[tokio::test]
async fn test_mock_backend_fails_on_schedule() {
    let backend = MockBackend::failing_every(Duration::ZERO, 3);
    let request = tiny_request(None);

    let mut outcomes = Vec::new();
    for _ in 0..6 {
        outcomes.push(backend.infer(&request).await.is_ok());
    }

    assert_eq!(outcomes, vec![true, true, false, true, true, false]);
    assert_eq!(backend.calls(), 6);
    assert_eq!(backend.name(), "mock");
}
