//! Integration tests for health, API key, rate limiting and
//! Idempotency-Key echo.

#![allow(clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_app, build_test_app, get, send, send_with_headers, test_config};
use escola_api::config::AppConfig;
use serde_json::json;

fn with_api_key() -> AppConfig {
    AppConfig {
        api_key: Some("segredo".to_string()),
        ..test_config()
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_test_app();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_api_key_is_401() {
    let app = build_app(with_api_key());
    let response = get(&app, "/escolas").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "API Key não fornecida");
    assert_eq!(body["path"], "/escolas");
}

#[tokio::test]
async fn wrong_api_key_is_403() {
    let app = build_app(with_api_key());
    let response =
        send_with_headers(&app, Method::GET, "/escolas", None, &[("X-API-Key", "errada")]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "API Key inválida");
}

#[tokio::test]
async fn correct_api_key_passes_and_health_is_open() {
    let app = build_app(with_api_key());
    let response =
        send_with_headers(&app, Method::GET, "/escolas", None, &[("X-API-Key", "segredo")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_returns_429_after_window_is_spent() {
    let app = build_app(AppConfig {
        rate_limit_max_requests: 3,
        rate_limit_window_ms: 60_000,
        ..test_config()
    });
    for _ in 0..3 {
        assert_eq!(get(&app, "/escolas").await.status(), StatusCode::OK);
    }
    let response = get(&app, "/escolas").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
    let body = body_json(response).await;
    assert_eq!(body["code"], 429);

    assert_eq!(get(&app, "/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn idempotency_key_is_echoed_or_generated() {
    let app = build_test_app();
    let body = json!({ "nome": "Escola Central", "capacidade": 10 });

    let response = send_with_headers(
        &app,
        Method::POST,
        "/escolas",
        Some(body),
        &[("Idempotency-Key", "abc-123")],
    )
    .await;
    assert_eq!(
        response
            .headers()
            .get("idempotency-key")
            .and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );

    let response = send(
        &app,
        Method::POST,
        "/escolas",
        Some(json!({ "nome": "Escola Norte", "capacidade": 10 })),
    )
    .await;
    let generated = response
        .headers()
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    let response = get(&app, "/escolas").await;
    assert!(response.headers().get("idempotency-key").is_none());
}
