use auth::IdentityDirective;
use indoc::formatdoc;
use integration_tests::{LmsStub, TestServer, gateway_config};
use serde_json::json;

async fn login(server: &TestServer, username: &str) {
    let response = server
        .client
        .post("/auth/authenticate", &json!({"username": username, "password": "secret"}))
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["decision"], "pass");
}

async fn complete(server: &TestServer, body: serde_json::Value) -> serde_json::Value {
    let response = server.client.post("/auth/complete", &body).await;
    assert_eq!(response.status(), 200);

    response.json().await.unwrap()
}

#[tokio::test]
async fn first_login_plans_full_identity_update() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    login(&server, "bob").await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;

    assert_eq!(
        body,
        json!({
            "directives": [
                {"directive": "set_real_name", "value": "Bob Jones"},
                {"directive": "set_email", "value": "bob@x.org"},
                {"directive": "confirm_email"},
            ]
        })
    );

    // The wire form round-trips into the typed directives.
    let directives: Vec<IdentityDirective> = serde_json::from_value(body["directives"].clone()).unwrap();
    assert_eq!(
        directives,
        vec![
            IdentityDirective::SetRealName {
                value: "Bob Jones".to_string()
            },
            IdentityDirective::SetEmail {
                value: "bob@x.org".to_string()
            },
            IdentityDirective::ConfirmEmail,
        ]
    );
}

#[tokio::test]
async fn returning_login_keeps_real_name() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    login(&server, "bob").await;

    let body = complete(
        &server,
        json!({"username": "bob", "identity": {"real_name": "Bob Jones"}}),
    )
    .await;

    assert_eq!(
        body,
        json!({
            "directives": [
                {"directive": "set_email", "value": "bob@x.org"},
                {"directive": "confirm_email"},
            ]
        })
    );
}

#[tokio::test]
async fn colliding_real_name_gets_numeric_suffix() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    login(&server, "bob").await;

    let body = complete(
        &server,
        json!({
            "username": "bob",
            "identity": {"taken_real_names": ["Bob Jones", "Bob Jones 2"]},
        }),
    )
    .await;

    assert_eq!(
        body["directives"][0],
        json!({"directive": "set_real_name", "value": "Bob Jones 3"})
    );
}

#[tokio::test]
async fn completion_without_pending_attempt_plans_nothing() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;

    assert_eq!(body, json!({"directives": []}));
}

#[tokio::test]
async fn pending_attempt_is_consumed_exactly_once() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    login(&server, "bob").await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;
    assert_eq!(body["directives"].as_array().map(Vec::len), Some(3));

    // The second consumer of the same attempt finds nothing.
    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;
    assert_eq!(body, json!({"directives": []}));
}

#[tokio::test]
async fn completion_canonicalizes_the_username() {
    let stub = LmsStub::builder().start().await;
    let server = TestServer::start(&gateway_config(&stub.base_url)).await;

    login(&server, "bob").await;

    // Same identity, sloppier spelling: the arena key still matches.
    let body = complete(&server, json!({"username": "  bob ", "identity": {}})).await;
    assert_eq!(body["directives"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn privileged_group_granted_on_matching_email() {
    let stub = LmsStub::builder().start().await;
    let config = formatdoc! {r#"
        [lms]
        base_url = "{base_url}"

        [lms.auto_privileged]
        bob = "bob@x.org"
    "#, base_url = stub.base_url};
    let server = TestServer::start(&config).await;

    login(&server, "bob").await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;
    let directives = body["directives"].as_array().unwrap();

    assert!(directives.contains(&json!({"directive": "add_to_group", "group": "bureaucrat"})));
}

#[tokio::test]
async fn privileged_group_revoked_on_unset() {
    let stub = LmsStub::builder().start().await;
    let config = formatdoc! {r#"
        [lms]
        base_url = "{base_url}"

        [lms.auto_privileged]
        bob = "unset"
    "#, base_url = stub.base_url};
    let server = TestServer::start(&config).await;

    login(&server, "bob").await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;
    let directives = body["directives"].as_array().unwrap();

    assert!(directives.contains(&json!({"directive": "remove_from_group", "group": "bureaucrat"})));
}

#[tokio::test]
async fn privileged_group_untouched_on_email_mismatch() {
    let stub = LmsStub::builder().start().await;
    let config = formatdoc! {r#"
        [lms]
        base_url = "{base_url}"

        [lms.auto_privileged]
        bob = "someone-else@x.org"
    "#, base_url = stub.base_url};
    let server = TestServer::start(&config).await;

    login(&server, "bob").await;

    let body = complete(&server, json!({"username": "bob", "identity": {}})).await;
    let directives = body["directives"].as_array().unwrap();

    assert!(!directives.iter().any(|d| {
        let name = d["directive"].as_str().unwrap_or_default();
        name == "add_to_group" || name == "remove_from_group"
    }));
}
