use axum::http::StatusCode;
use integration_tests::{LmsStub, SeenRequest, TestServer, gateway_config};
use serde_json::json;

async fn authenticate(server: &TestServer, body: serde_json::Value) -> serde_json::Value {
    let response = server.client.post("/auth/authenticate", &body).await;
    assert_eq!(response.status(), 200);

    response.json().await.unwrap()
}

#[tokio::test]
async fn valid_credentials_pass() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;

    assert_eq!(body, json!({"decision": "pass", "username": "bob"}));

    // The credential exchange carried the fixed mobile-service identifier.
    let requests = stub.requests();
    assert_eq!(
        requests.first(),
        Some(&SeenRequest::Token {
            username: Some("bob".to_string()),
            service: Some("moodle_mobile_app".to_string()),
        })
    );

    // Both informational calls followed, in order.
    assert_eq!(
        stub.rest_functions(),
        vec!["core_webservice_get_site_info", "core_user_get_users_by_field"]
    );
}

#[tokio::test]
async fn issued_token_is_used_verbatim() {
    let stub = LmsStub::builder().token(json!({"token": "SEKRET9"})).start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body["decision"], "pass");

    let tokens: Vec<_> = stub
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            SeenRequest::Rest { wstoken, .. } => wstoken,
            SeenRequest::Token { .. } => None,
        })
        .collect();

    assert_eq!(tokens, vec!["SEKRET9", "SEKRET9"]);
}

#[tokio::test]
async fn rejected_credentials_abstain() {
    let stub = LmsStub::builder()
        .token(json!({"error": "Invalid login, please try again"}))
        .start()
        .await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "wrong"})).await;

    assert_eq!(body, json!({"decision": "abstain"}));

    // The failed exchange never proceeds to the web-service calls.
    assert!(stub.rest_functions().is_empty());
}

#[tokio::test]
async fn remote_exception_abstains() {
    let stub = LmsStub::builder()
        .token(json!({
            "exception": "moodle_exception",
            "errorcode": "invalidlogin",
            "message": "Invalid login, please try again",
        }))
        .start()
        .await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "wrong"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));
}

#[tokio::test]
async fn http_error_abstains() {
    let stub = LmsStub::builder()
        .token_status(StatusCode::INTERNAL_SERVER_ERROR)
        .start()
        .await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));
}

#[tokio::test]
async fn non_json_token_response_abstains() {
    let stub = LmsStub::builder().token_raw("<html>bad gateway</html>").start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));
}

#[tokio::test]
async fn unreachable_remote_abstains() {
    // Nothing listens on this port.
    let server = TestServer::start(&gateway_config("http://127.0.0.1:9")).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));
}

#[tokio::test]
async fn identity_mismatch_abstains_before_user_lookup() {
    let stub = LmsStub::builder()
        .site_info(json!({"userid": 7, "username": "eve"}))
        .start()
        .await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;

    assert_eq!(body, json!({"decision": "abstain"}));
    assert_eq!(stub.rest_functions(), vec!["core_webservice_get_site_info"]);
}

#[tokio::test]
async fn site_info_username_match_is_case_insensitive() {
    let stub = LmsStub::builder()
        .site_info(json!({"userid": 7, "username": "BOB"}))
        .start()
        .await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body["decision"], "pass");
}

#[tokio::test]
async fn empty_user_lookup_abstains() {
    let stub = LmsStub::builder().users(json!([])).start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob", "password": "secret"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));
}

#[tokio::test]
async fn missing_password_abstains_without_remote_calls() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob"})).await;

    assert_eq!(body, json!({"decision": "abstain"}));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn empty_credentials_abstain_without_remote_calls() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "", "password": "secret"})).await;
    assert_eq!(body, json!({"decision": "abstain"}));

    let body = authenticate(&server, json!({"username": "bob", "password": ""})).await;
    assert_eq!(body, json!({"decision": "abstain"}));

    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn uncanonicalizable_username_abstains_without_remote_calls() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = authenticate(&server, json!({"username": "bob|admin", "password": "secret"})).await;

    assert_eq!(body, json!({"decision": "abstain"}));
    assert!(stub.requests().is_empty());
}
