//! HTTP surface tests driving the router in-process.

mod common;

use common::{test_config, RecordingStore, StoreOp, TestApp};
use http_body_util::BodyExt;
use service_core::axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

async fn post_json(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(router: Router, uri: &str) -> (StatusCode, String, Option<String>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap(), request_id)
}

#[tokio::test]
async fn test_signin_returns_ok_without_ticket() {
    // Arrange
    let app = TestApp::new(test_config());

    // Act
    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "jane@acme.com" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!("OK"));

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(!body.to_string().contains(&sent[0].data.ticket));
}

#[tokio::test]
async fn test_signin_accepts_camel_case_options() {
    let mut config = test_config();
    config.users.allowed_locales = vec!["en".to_string(), "fr".to_string()];
    let app = TestApp::new(config);

    let (status, _) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({
            "email": "jane@acme.com",
            "options": {
                "allowedRoles": ["user"],
                "defaultRole": "user",
                "displayName": "Jane Doe",
                "locale": "fr",
                "metadata": { "asd": "asd" },
                "redirectTo": "http://localhost:3000/welcome"
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let created = &app.store.creates()[0];
    assert_eq!(created.display_name, "Jane Doe");
    assert_eq!(created.locale, "fr");
    assert_eq!(app.notifier.sent()[0].data.redirect_to, "http://localhost:3000/welcome");
}

#[tokio::test]
async fn test_policy_rejections_use_the_error_table() {
    let mut config = test_config();
    config.signin.disable_signup = true;
    let app = TestApp::new(config);

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "jane@acme.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        serde_json::json!({
            "status": 403,
            "error": "signup-disabled",
            "message": "Sign up is disabled."
        })
    );

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({
            "email": "jane@acme.com",
            "options": { "redirectTo": "https://evil.com" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "redirecTo-not-allowed");
    assert_eq!(body["message"], "The value of \"options.redirectTo\" is not allowed.");
}

#[tokio::test]
async fn test_disabled_endpoint_returns_conflict() {
    let mut config = test_config();
    config.signin.passwordless_email_enabled = false;
    let app = TestApp::new(config);

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "jane@acme.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "disabled-endpoint");
    assert_eq!(body["message"], "This endpoint is disabled");
}

#[tokio::test]
async fn test_invalid_email_is_a_bad_request() {
    let app = TestApp::new(test_config());

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "not-an-email" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid-request");
    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_missing_email_is_a_bad_request() {
    let app = TestApp::new(test_config());

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "options": {} }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["error"], "invalid-request");
}

#[tokio::test]
async fn test_store_failure_is_an_opaque_internal_error() {
    let store = RecordingStore::new();
    store.fail_on(StoreOp::Create);
    let app = TestApp::with_store(test_config(), store);

    let (status, body) = post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "jane@acme.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({
            "status": 500,
            "error": "internal-server-error",
            "message": "Internal server error"
        })
    );
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let app = TestApp::new(test_config());
    let (status, body, request_id) = get(app.router.clone(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "signin-service-test");
    assert_eq!(body["checks"]["identity_store"], "up");
    assert!(request_id.is_some());

    let store = RecordingStore::new();
    store.fail_on(StoreOp::HealthCheck);
    let app = TestApp::with_store(test_config(), store);
    let (status, _, _) = get(app.router.clone(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_openapi_document_lists_signin_route() {
    let app = TestApp::new(test_config());
    let (status, body, _) = get(app.router.clone(), "/.well-known/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(doc["paths"]["/signin/passwordless/email"]["post"].is_object());
}

#[tokio::test]
async fn test_metrics_count_flow_outcomes() {
    signin_service::services::metrics::init_metrics().unwrap();
    let app = TestApp::new(test_config());

    post_json(
        app.router.clone(),
        "/signin/passwordless/email",
        serde_json::json!({ "email": "jane@acme.com" }),
    )
    .await;

    let (status, body, _) = get(app.router.clone(), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("signin_flow_outcomes_total"));
    assert!(body.contains("flow=\"passwordlessEmail\""));
}

#[tokio::test]
async fn test_state_exposes_session_issuer() {
    let app = TestApp::new(test_config());
    app.state.passwordless_email.execute(
        signin_service::dtos::signin::SigninPasswordlessEmailRequest::new("jane@acme.com"),
    )
    .await
    .unwrap();

    let id = app.store.ticket_updates()[0].0;
    let identity = app.store.get(id).unwrap();
    let session = app.state.sessions.issue_session(&identity).unwrap();
    assert_eq!(session.token_type, "Bearer");
    assert!(!session.access_token.is_empty());
}
