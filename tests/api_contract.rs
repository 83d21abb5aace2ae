use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::IntoResponse,
};

use base_backend::error::ProblemFieldError;
use base_backend::features::base::models::{LoadBaseResponse, Save};

async fn problem_json(err: base_backend::AppError) -> (StatusCode, String, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("missing Content-Type")
        .to_str()
        .expect("invalid Content-Type")
        .to_string();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
    (status, content_type, v)
}

/// 全局错误统一为 ProblemDetails（application/problem+json），且包含 message + code。
#[tokio::test]
async fn app_error_into_response_is_problem_details() {
    let (status, content_type, v) =
        problem_json(base_backend::AppError::Json("expected value".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/problem+json");
    assert_eq!(v["status"], 400);
    assert_eq!(v["code"], "BAD_REQUEST");
    assert!(v.get("type").is_some());
    assert!(v.get("title").is_some());
    assert!(v["message"].as_str().is_some());
}

#[tokio::test]
async fn stable_codes_match_status() {
    use base_backend::AppError;

    let cases = [
        (AppError::UsernameTaken, 409, "USERNAME_TAKEN"),
        (AppError::EmailTaken, 409, "EMAIL_TAKEN"),
        (AppError::NotFound("Base save not found for baseid: 7".into()), 404, "NOT_FOUND"),
        (AppError::AuthFailed, 401, "AUTH_FAILED"),
        (AppError::InvalidCredentials, 401, "INVALID_CREDENTIALS"),
        (AppError::Unauthorized("no token".into()), 401, "UNAUTHORIZED"),
        (AppError::Validation("bad baseid".into()), 422, "VALIDATION_FAILED"),
    ];
    for (err, status, code) in cases {
        let (s, _, v) = problem_json(err).await;
        assert_eq!(s.as_u16(), status);
        assert_eq!(v["code"], code);
    }
}

#[tokio::test]
async fn internal_error_detail_is_hidden() {
    let (status, _, v) =
        problem_json(base_backend::AppError::Internal("sqlite: disk I/O error".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["code"], "INTERNAL_ERROR");
    assert!(!v.to_string().contains("sqlite"));
}

#[tokio::test]
async fn field_errors_are_serialized() {
    let (status, _, v) = problem_json(base_backend::AppError::InvalidFields(vec![
        ProblemFieldError::new("username", "too short"),
    ]))
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["errors"][0]["field"], "username");
    assert_eq!(v["errors"][0]["message"], "too short");
}

/// 对外 JSON 字段命名统一 camelCase。
#[test]
fn save_serializes_as_camel_case() {
    let resp = LoadBaseResponse {
        save: Save {
            baseid: 1,
            userid: 2,
            basename: "b".to_string(),
            level: 3,
            resources: serde_json::json!({"r1": 0}),
            rewards: vec!["korath".to_string()],
            created_at: 10,
            updated_at: 11,
        },
        own: true,
    };
    let v = serde_json::to_value(resp).expect("serialize json");
    assert!(v["save"].get("createdAt").is_some());
    assert!(v["save"].get("created_at").is_none());
    assert_eq!(v["own"], true);
}

#[tokio::test]
async fn unknown_route_and_health() {
    use std::sync::Arc;
    use tower::ServiceExt;

    let path = std::env::temp_dir().join(format!("base_backend_contract_{}.db", uuid::Uuid::new_v4()));
    let storage = base_backend::storage::GameStorage::connect_sqlite(
        path.to_string_lossy().as_ref(),
        false,
    )
    .await
    .expect("connect sqlite");
    let state = base_backend::state::AppState {
        storage: Arc::new(storage),
        balancer: Arc::new(base_backend::features::base::LevelRewardBalancer::default()),
        auth: Arc::new(Default::default()),
    };
    let app = base_backend::build_app(state, &base_backend::AppConfig::default());

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
    assert_eq!(v["status"], "healthy");

    let resp = app
        .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
        .await
        .expect("request unknown route");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/problem+json")
    );
}
