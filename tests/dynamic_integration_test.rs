use dynrest_client::{ClientConfig, DynRestClient, FileBlob, Payload};
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{
    body_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a test client
fn create_test_client(server: &MockServer) -> DynRestClient {
    DynRestClient::new(
        ClientConfig::new(server.uri())
            .with_token("user-token")
            .with_service_token("service-token"),
    )
    .expect("Failed to create client")
}

/// Test unknown namespace with a mapping argument posts JSON
#[tokio::test]
async fn test_unknown_method_posts_json() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reports/generate"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"month": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"report": "r1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let report = assert_ok!(
        client
            .module("reports")
            .call("generate", vec![Payload::from(json!({"month": 1}))])
            .await
    );
    assert_eq!(report.as_json().unwrap()["report"], "r1");
}

/// Test fixed read methods go out as GET with query
#[tokio::test]
async fn test_read_method_uses_get_query() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reports/list"))
        .and(query_param("month", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert_ok!(
        client
            .module("reports")
            .call("list", vec![Payload::from(json!({"month": 1}))])
            .await
    );

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

/// Test search and filter reads, and a search carrying a file
#[tokio::test]
async fn test_search_and_filter_reads() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/media/search"))
        .and(query_param("term", "cat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/a1/filter"))
        .and(query_param("year", "2020"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/media/search"))
        .and(body_string_contains(r#"name="image""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "m1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let media = client.module("media");
    assert_ok!(media.call("search", vec![Payload::from(json!({"term": "cat"}))]).await);
    assert_ok!(
        client
            .module("albums")
            .call("filter", vec![Payload::from("a1"), Payload::from(json!({"year": 2020}))])
            .await
    );
    let by_image = Payload::map([("image", FileBlob::new("jpeg-bytes"))]);
    assert_ok!(media.call("search", vec![by_image]).await);
}

/// Test path parameters and the bodiless GET fallback
#[tokio::test]
async fn test_path_params_without_body() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/agents/a1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "idle"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert_ok!(
        client
            .module("agents")
            .call("status", vec![Payload::from("a1")])
            .await
    );
}

/// Test file upload through a dynamic module
#[tokio::test]
async fn test_file_argument_is_multipart() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/resize/run"))
        .and(body_string_contains(r#"name="file""#))
        .and(body_string_contains("raw-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert_ok!(
        client
            .module("functions")
            .call(
                "run",
                vec![Payload::from("resize"), Payload::from(FileBlob::new("raw-image"))]
            )
            .await
    );
}

/// Test service role uses its own token
#[tokio::test]
async fn test_service_role_token() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Todo"))
        .and(header("authorization", "Bearer service-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appLogs/record"))
        .and(header("authorization", "Bearer service-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Todo"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let service = client.as_service_role();
    assert_ok!(service.entities().entity("Todo").list(Default::default()).await);
    assert_ok!(
        service
            .module("appLogs")
            .call("record", vec![Payload::from(json!({"page": "home"}))])
            .await
    );
    assert_ok!(client.entities().entity("Todo").list(Default::default()).await);
}

/// Test integration actions
#[tokio::test]
async fn test_integration_invoke() {
    let _ = env_logger::try_init();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/integrations/Core/SendEmail"))
        .and(body_json(json!({"to": "a@b.c"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sent": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/integrations/Core/Ping"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let integrations = client.integrations();
    let core = integrations.package("Core");
    assert_ok!(core.invoke("SendEmail", json!({"to": "a@b.c"})).await);
    assert_ok!(core.invoke("Ping", Payload::null()).await);
}
