//! Integration tests for the student endpoints.

#![allow(clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{
    body_json, build_test_app, create_school, create_student, enroll_ok, get, send,
};
use serde_json::json;

#[tokio::test]
async fn head_reports_existence_without_body() {
    let app = build_test_app();
    let id = create_student(&app, "Ana Souza", 9).await;

    let response = send(&app, Method::HEAD, &format!("/alunos/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::HEAD, "/alunos/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_required_fields_are_reported() {
    let app = build_test_app();
    let response = send(&app, Method::POST, "/alunos", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let Some(details) = body["details"].as_array() else {
        panic!("expected details: {body}");
    };
    assert_eq!(details.len(), 3);
}

#[tokio::test]
async fn malformed_json_is_400_with_error_body() {
    let app = build_test_app();
    let response = send(&app, Method::POST, "/alunos", Some(json!("not an object"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["path"], "/alunos");
}

#[tokio::test]
async fn search_filters_by_name_and_age() {
    let app = build_test_app();
    create_student(&app, "Ana Souza", 9).await;
    create_student(&app, "Mariana Alves", 12).await;
    create_student(&app, "Bruno Lima", 10).await;

    let body = body_json(get(&app, "/alunos/search?nome=ANA").await).await;
    let Some(found) = body.as_array() else {
        panic!("expected array: {body}");
    };
    assert_eq!(found.len(), 2);

    let body = body_json(get(&app, "/alunos/search?nome=ana&idadeMin=10&idadeMax=12").await).await;
    let Some(found) = body.as_array() else {
        panic!("expected array: {body}");
    };
    assert_eq!(found.len(), 1);
    assert_eq!(found.first().map(|s| s["nome"].clone()), Some(json!("Mariana Alves")));

    let body = body_json(get(&app, "/alunos/search?nome=zzz").await).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn inverted_age_range_matches_nobody() {
    let app = build_test_app();
    create_student(&app, "Ana Souza", 8).await;
    let response = get(&app, "/alunos/search?idadeMin=12&idadeMax=5").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn batch_create_reports_invalid_items() {
    let app = build_test_app();
    let response = send(
        &app,
        Method::POST,
        "/alunos/lote",
        Some(json!([
            { "nome": "Ana Souza", "idade": 9, "dataNascimento": "2015-03-09" },
            { "nome": "X", "idade": 9, "dataNascimento": "2015-03-09" },
            { "nome": "Bruno Lima", "idade": 10, "dataNascimento": "2014-01-20" },
        ])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["criados"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["falhas"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["falhas"][0]["indice"], 1);

    let listed = body_json(get(&app, "/alunos").await).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = build_test_app();
    let response = send(&app, Method::POST, "/alunos/lote", Some(json!([]))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enrollments_of_student_and_average_age() {
    let app = build_test_app();
    let school = create_school(&app, "Escola Central", 10).await;
    let ana = create_student(&app, "Ana Souza", 8).await;
    let bruno = create_student(&app, "Bruno Lima", 12).await;
    enroll_ok(&app, ana, school).await;
    enroll_ok(&app, bruno, school).await;

    let body = body_json(get(&app, &format!("/alunos/{ana}/matriculas")).await).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let response = get(&app, "/alunos/999/matriculas").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(get(&app, "/alunos/media-idade").await).await;
    assert_eq!(body[school.to_string()], 10.0);
}

#[tokio::test]
async fn update_and_delete_student() {
    let app = build_test_app();
    let id = create_student(&app, "Ana Souza", 9).await;

    let response = send(
        &app,
        Method::PUT,
        &format!("/alunos/{id}"),
        Some(json!({
            "nome": "Ana Souza Lima",
            "idade": 10,
            "dataNascimento": "2015-03-09",
            "emailResponsavel": "mae@example.com",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["nome"], "Ana Souza Lima");
    assert_eq!(body["idade"], 10);

    let response = send(&app, Method::DELETE, &format!("/alunos/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get(&app, &format!("/alunos/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_cascades_enrollments_and_frees_seat() {
    let app = build_test_app();
    let school = create_school(&app, "Escola Pequena", 1).await;
    let ana = create_student(&app, "Ana Souza", 9).await;
    let bruno = create_student(&app, "Bruno Lima", 10).await;
    let enrollment = enroll_ok(&app, ana, school).await;

    let response = send(&app, Method::DELETE, &format!("/alunos/{ana}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/matriculas/{enrollment}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(get(&app, "/matriculas").await).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    enroll_ok(&app, bruno, school).await;
}
