//! HTTP API end to end over the in-process router.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{ROOT_PASSWORD, TestAuth, sample_graph};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/pub/login",
        None,
        Some(json!({ "username": username, "password": password, "view": "tenantA" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn full_session_flow() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();

    let token = login(&app, "alice", "alice-pw").await;

    let (status, user) = send(&app, Method::GET, "/api/v1/pub/current/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["user_id"], "U1");
    assert_eq!(user["roles"][0]["id"], "R1");

    let (status, tree) = send(&app, Method::GET, "/api/v1/pub/current/menutree", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["list"][0]["id"], "M1");
    assert_eq!(tree["list"][0]["children"][0]["id"], "M2");
    assert_eq!(tree["list"][0]["children"][0]["parentId"], "M1");
    assert_eq!(tree["list"][0]["children"][0]["actions"], json!(["a1"]));

    let (status, refreshed) = send(&app, Method::POST, "/api/v1/pub/refresh-token", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = refreshed["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::POST, "/api/v1/pub/login/exit", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/v1/pub/current/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");

    // The refreshed token is independent of the revoked one.
    let (status, _) = send(&app, Method::GET, "/api/v1/pub/current/user", Some(&refreshed), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refreshed_token_keeps_view() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    let token = login(&app, "alice", "alice-pw").await;

    let (_, refreshed) = send(&app, Method::POST, "/api/v1/pub/refresh-token", Some(&token), None).await;
    let refreshed = refreshed["access_token"].as_str().unwrap();
    let (subject, view) = auth.tokens.validate(refreshed).await.unwrap();
    assert_eq!(subject, "U1");
    assert_eq!(view, "tenantA");
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();

    let (unknown_status, unknown) = send(
        &app,
        Method::POST,
        "/api/v1/pub/login",
        None,
        Some(json!({ "username": "mallory", "password": "x" })),
    )
    .await;
    let (wrong_status, wrong) = send(
        &app,
        Method::POST,
        "/api/v1/pub/login",
        None,
        Some(json!({ "username": "alice", "password": "x" })),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown["error"]["code"], "invalid_user");
    assert_eq!(wrong["error"]["code"], "invalid_password");
    assert_eq!(unknown["error"]["message"], wrong["error"]["message"]);
}

#[tokio::test]
async fn protected_routes_require_bearer() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();

    for (method, uri) in [
        (Method::GET, "/api/v1/pub/current/user"),
        (Method::GET, "/api/v1/pub/current/menutree"),
        (Method::POST, "/api/v1/pub/refresh-token"),
        (Method::POST, "/api/v1/pub/login/exit"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"]["code"], "invalid_token");
    }
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    let token = login(&app, "alice", "alice-pw").await;

    auth.clock.advance(auth.tokens.expiry_secs());
    let (status, _) = send(&app, Method::GET, "/api/v1/pub/current/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subject_without_roles_gets_forbidden_tree() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    let token = login(&app, "nobody", "nobody-pw").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/pub/current/menutree", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "no_permission");
}

#[tokio::test]
async fn password_change_over_http() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    let token = login(&app, "alice", "alice-pw").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/pub/current/password",
        Some(&token),
        Some(json!({ "old_password": "nope", "new_password": "next" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_old_credential");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/pub/current/password",
        Some(&token),
        Some(json!({ "old_password": "alice-pw", "new_password": "next" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    login(&app, "alice", "next").await;
}

#[tokio::test]
async fn root_session() {
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    let token = login(&app, "root", ROOT_PASSWORD).await;

    let (status, user) = send(&app, Method::GET, "/api/v1/pub/current/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["user_name"], "root");
    assert_eq!(user["roles"], json!([]));

    let (status, tree) = send(&app, Method::GET, "/api/v1/pub/current/menutree", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["list"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/pub/current/password",
        Some(&token),
        Some(json!({ "old_password": ROOT_PASSWORD, "new_password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "root_credential_immutable");
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    gatekeeper::metrics::init();
    let auth = TestAuth::with_graph(Arc::new(sample_graph()));
    let app = auth.router();
    login(&app, "alice", "alice-pw").await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("gatekeeper_tokens_issued_total"));
}
