//! Integration tests for reports and CSV export.

#![allow(clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{
    body_json, body_text, build_test_app, create_school, create_student, enroll_ok, get, send,
    today,
};

#[tokio::test]
async fn ranking_orders_by_occupancy() {
    let app = build_test_app();
    let half = create_school(&app, "Escola Metade", 2).await;
    let full = create_school(&app, "Escola Cheia", 1).await;
    let empty = create_school(&app, "Escola Vazia", 4).await;
    let ana = create_student(&app, "Ana Souza", 8).await;
    let bruno = create_student(&app, "Bruno Lima", 12).await;
    enroll_ok(&app, ana, half).await;
    enroll_ok(&app, bruno, full).await;

    let response = get(&app, "/relatorios/escolas/ranking").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let Some(entries) = body.as_array() else {
        panic!("expected array: {body}");
    };
    let order: Vec<i64> = entries.iter().filter_map(|e| e["escolaId"].as_i64()).collect();
    assert_eq!(order, vec![full, half, empty]);
    assert_eq!(body[0]["ocupacao"], 100.0);
    assert_eq!(body[0]["mediaIdade"], 12.0);
    assert_eq!(body[1]["totalAlunos"], 1);
}

#[tokio::test]
async fn growth_and_attrition_windows() {
    let app = build_test_app();
    let school = create_school(&app, "Escola Central", 4).await;
    let ana = create_student(&app, "Ana Souza", 9).await;
    let bruno = create_student(&app, "Bruno Lima", 10).await;
    enroll_ok(&app, ana, school).await;
    let cancelled = enroll_ok(&app, bruno, school).await;
    send(&app, Method::DELETE, &format!("/matriculas/{cancelled}"), None).await;

    let day = today();
    let body = body_json(
        get(
            &app,
            &format!("/relatorios/escolas/crescimento?dataInicio={day}&dataFim={day}"),
        )
        .await,
    )
    .await;
    assert_eq!(body[0]["matriculasNovas"], 2);
    assert_eq!(body[0]["crescimentoPercentual"], 50.0);

    let body = body_json(
        get(
            &app,
            &format!("/relatorios/alunos/evasao?dataInicio={day}&dataFim={day}"),
        )
        .await,
    )
    .await;
    let Some(entries) = body.as_array() else {
        panic!("expected array: {body}");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(body[0]["matriculaId"], cancelled);
    assert_eq!(body[0]["alunoNome"], "Bruno Lima");
}

#[tokio::test]
async fn malformed_or_inverted_period_is_400() {
    let app = build_test_app();
    let response = get(
        &app,
        "/relatorios/alunos/evasao?dataInicio=10/01/2024&dataFim=2024-02-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|m| m.contains("YYYY-MM-DD"))
    );

    let response = get(
        &app,
        "/relatorios/escolas/crescimento?dataInicio=2024-03-01&dataFim=2024-02-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn occupancy_report_for_missing_school_is_404() {
    let app = build_test_app();
    let response = get(&app, "/relatorios/escolas/42/ocupacao").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_csv_is_an_attachment() {
    let app = build_test_app();
    create_student(&app, "Ana Souza", 9).await;

    let response = get(&app, "/export/alunos/csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );
    let disposition = headers
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    assert_eq!(
        disposition,
        format!("attachment; filename=\"alunos_{}.csv\"", today())
    );

    let text = body_text(response).await;
    let mut lines = text.lines();
    assert!(lines.next().is_some_and(|h| h.starts_with("ID,Nome,Idade")));
    assert!(lines.next().is_some_and(|l| l.contains("Ana Souza")));
}

#[tokio::test]
async fn school_and_enrollment_csv() {
    let app = build_test_app();
    let school = create_school(&app, "Escola Central", 4).await;
    let ana = create_student(&app, "Ana Souza", 9).await;
    enroll_ok(&app, ana, school).await;

    let text = body_text(get(&app, "/export/escolas/csv").await).await;
    assert_eq!(text.lines().count(), 2);

    let text = body_text(get(&app, "/export/matriculas/csv").await).await;
    assert!(text.contains(",ATIVA,"));
}
