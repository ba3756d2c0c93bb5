//! Shared helpers for HTTP integration tests.
//!
//! Every test gets its own router over a fresh in-memory store, driven
//! through `tower::ServiceExt::oneshot`.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use escola_api::api;
use escola_api::app_state::AppState;
use escola_api::config::AppConfig;
use escola_api::persistence::MemoryStore;

/// Configuration with authentication and rate limiting disabled.
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

/// Router over a fresh in-memory store with [`test_config`].
pub fn build_test_app() -> Router {
    build_app(test_config())
}

/// Router over a fresh in-memory store with the given configuration.
pub fn build_app(config: AppConfig) -> Router {
    api::build_router(AppState::new(Arc::new(MemoryStore::new()), config))
}

/// Sends one request, with a JSON body when `body` is given.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    send_with_headers(app, method, uri, body, &[]).await
}

/// Sends one request with extra headers.
pub async fn send_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("invalid request for {uri}");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router failed for {uri}");
    };
    response
}

/// `GET uri`.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

/// Reads the body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let text = body_text(response).await;
    let Ok(value) = serde_json::from_str(&text) else {
        panic!("body is not JSON: {text}");
    };
    value
}

/// Reads the body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let Ok(collected) = response.into_body().collect().await else {
        panic!("failed to read body");
    };
    let Ok(text) = String::from_utf8(collected.to_bytes().to_vec()) else {
        panic!("body is not UTF-8");
    };
    text
}

/// Today as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

/// Creates a school and returns its ID.
pub async fn create_school(app: &Router, name: &str, capacity: i32) -> i64 {
    let response = send(
        app,
        Method::POST,
        "/escolas",
        Some(json!({ "nome": name, "capacidade": capacity })),
    )
    .await;
    let status = response.status();
    let body = body_json(response).await;
    let Some(id) = body["id"].as_i64() else {
        panic!("school not created ({status}): {body}");
    };
    id
}

/// Creates a student and returns its ID.
pub async fn create_student(app: &Router, name: &str, age: i32) -> i64 {
    let response = send(
        app,
        Method::POST,
        "/alunos",
        Some(json!({
            "nome": name,
            "idade": age,
            "dataNascimento": "2015-03-09",
        })),
    )
    .await;
    let status = response.status();
    let body = body_json(response).await;
    let Some(id) = body["id"].as_i64() else {
        panic!("student not created ({status}): {body}");
    };
    id
}

/// Posts an enrollment starting today.
pub async fn enroll(app: &Router, student: i64, school: i64) -> Response<Body> {
    send(
        app,
        Method::POST,
        "/matriculas",
        Some(json!({
            "alunoId": student,
            "escolaId": school,
            "dataInicio": today(),
        })),
    )
    .await
}

/// Posts an enrollment and returns its ID.
pub async fn enroll_ok(app: &Router, student: i64, school: i64) -> i64 {
    let response = enroll(app, student, school).await;
    let status = response.status();
    let body = body_json(response).await;
    let Some(id) = body["id"].as_i64() else {
        panic!("enrollment not created ({status}): {body}");
    };
    id
}
