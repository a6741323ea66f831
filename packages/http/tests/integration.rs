use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arm_lro_core::{
    Error, FileStateStore, HttpRequest, Method, OperationStatus, PollingState, StateStore,
};
use arm_lro_http::{CancellationToken, PollError, Poller, PollerConfig, ReqwestExecutor};

fn poller() -> Poller<ReqwestExecutor> {
    let config = PollerConfig::default()
        .with_default_delay(Duration::from_millis(10))
        .with_max_polls(20);
    Poller::with_config(ReqwestExecutor::from_config(&config).unwrap(), config)
}

#[tokio::test]
async fn test_put_polls_async_operation_then_reads_resource() {
    let server = MockServer::start().await;
    let vm_url = format!("{}/subscriptions/s/vm1", server.uri());
    let op_url = format!("{}/operations/op1", server.uri());

    Mock::given(method("PUT"))
        .and(path("/subscriptions/s/vm1"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", op_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/s/vm1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vm1",
            "properties": {"provisioningState": "Succeeded"}
        })))
        .mount(&server)
        .await;

    let poller = poller();
    let initial = poller
        .begin(&HttpRequest::put(vm_url.as_str()).with_json_body(json!({"location": "eastus"})))
        .await
        .unwrap();

    assert_eq!(initial.status, OperationStatus::InProgress);
    assert_eq!(initial.status_code, 202);
    assert_eq!(initial.async_operation_link.as_deref(), Some(op_url.as_str()));
    assert_eq!(initial.retry_after_millis, 0);
    assert_eq!(initial.resource_uri.as_deref(), Some(vm_url.as_str()));

    let done = poller.run(initial, &CancellationToken::new()).await.unwrap();
    assert_eq!(done.status, OperationStatus::Succeeded);
    assert_eq!(done.initial_http_method, Method::PUT);

    let resource = poller.fetch_final_resource(&done).await.unwrap().unwrap();
    assert_eq!(resource.body["name"], "vm1");
}

#[tokio::test]
async fn test_delete_polls_location_with_logging_context() {
    let server = MockServer::start().await;
    let rg_url = format!("{}/subscriptions/s/resourcegroups/rg1", server.uri());
    let loc_url = format!("{}/operationresults/abc", server.uri());

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/s/resourcegroups/rg1"))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", loc_url.as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operationresults/abc"))
        .and(header("x-ms-logging-context", "sample-ctx"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operationresults/abc"))
        .and(header("x-ms-logging-context", "sample-ctx"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let poller = poller();
    let request =
        HttpRequest::delete(rg_url.as_str()).with_header("x-ms-logging-context", "sample-ctx");
    let initial = poller.begin(&request).await.unwrap();

    assert_eq!(initial.resource_uri, None);
    assert_eq!(initial.logging_context.as_deref(), Some("sample-ctx"));

    let mut seen = Vec::new();
    let done = poller
        .run_with(initial, &CancellationToken::new(), |s| seen.push(s.status))
        .await
        .unwrap();

    assert_eq!(done.status, OperationStatus::Succeeded);
    assert_eq!(
        seen,
        vec![
            OperationStatus::InProgress,
            OperationStatus::InProgress,
            OperationStatus::Succeeded
        ]
    );
}

#[tokio::test]
async fn test_default_headers_reach_the_server() {
    let server = MockServer::start().await;
    let op_url = format!("{}/operations/op2", server.uri());

    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .and(header("Authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ReqwestExecutor::with_default_timeout()
        .unwrap()
        .with_default_header("Authorization", "Bearer token-1");
    let poller = Poller::with_config(
        executor,
        PollerConfig::default().with_default_delay(Duration::from_millis(1)),
    );

    let state = PollingState::from_json(&format!(
        r#"{{"initialHttpMethod":"POST","status":"InProgress","statusCode":202,"asyncOperationLink":"{op_url}"}}"#
    ))
    .unwrap();

    let done = poller.run(state, &CancellationToken::new()).await.unwrap();
    assert_eq!(done.status, OperationStatus::Succeeded);
}

#[tokio::test]
async fn test_resume_from_file_store() {
    let server = MockServer::start().await;
    let vm_url = format!("{}/vm2", server.uri());

    Mock::given(method("PATCH"))
        .and(path("/vm2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"provisioningState": "Updating"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vm2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"provisioningState": "Succeeded"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();

    {
        let store = FileStateStore::new(dir.path()).unwrap();
        let state = poller()
            .begin(&HttpRequest::patch(vm_url.as_str()))
            .await
            .unwrap();
        assert_eq!(state.status, OperationStatus::InProgress);
        assert_eq!(state.provisioning_state.as_deref(), Some("Updating"));
        store.save("vm2-patch", &state).unwrap();
    }

    let store = FileStateStore::new(dir.path()).unwrap();
    let resumed = store.load("vm2-patch").unwrap().unwrap();
    assert_eq!(resumed.poll_target().unwrap(), vm_url);

    let done = poller()
        .run_with(resumed, &CancellationToken::new(), |s| {
            store.save("vm2-patch", s).unwrap();
        })
        .await
        .unwrap();

    assert_eq!(done.status, OperationStatus::Succeeded);
    assert_eq!(store.load("vm2-patch").unwrap(), Some(done));
}

#[tokio::test]
async fn test_unparseable_poll_body_is_malformed() {
    let server = MockServer::start().await;
    let op_url = format!("{}/operations/bad", server.uri());

    Mock::given(method("GET"))
        .and(path("/operations/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let state = PollingState::from_json(&format!(
        r#"{{"initialHttpMethod":"DELETE","status":"InProgress","asyncOperationLink":"{op_url}"}}"#
    ))
    .unwrap();

    let error = poller()
        .run(state.clone(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PollError::Lro(Error::MalformedPollResponse { .. })
    ));
    assert_eq!(error.last_state(), Some(&state));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    // Nothing listens on port 1.
    let state = PollingState::from_json(
        r#"{"initialHttpMethod":"POST","status":"InProgress","locationLink":"http://127.0.0.1:1/op"}"#,
    )
    .unwrap();

    let error = poller()
        .run(state.clone(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, PollError::Transport { .. }));
    assert!(!error.is_timeout());
    assert_eq!(error.into_last_state(), Some(state));
}

#[tokio::test]
async fn test_failed_status_code_ends_loop_as_failed() {
    let server = MockServer::start().await;
    let op_url = format!("{}/operations/gone", server.uri());

    Mock::given(method("GET"))
        .and(path("/operations/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let state = PollingState::from_json(&format!(
        r#"{{"initialHttpMethod":"PUT","status":"InProgress","asyncOperationLink":"{op_url}"}}"#
    ))
    .unwrap();

    let done = poller().run(state, &CancellationToken::new()).await.unwrap();
    assert_eq!(done.status, OperationStatus::Failed);
    assert_eq!(done.status_code, 404);
    assert!(!done.is_server_error());
}
