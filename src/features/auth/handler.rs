//! 账号 API 处理模块（features/auth）
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
};

use crate::error::AppError;
use crate::http::{AppJson, client_ip};
use crate::state::AppState;

use super::models::{FilteredUser, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use super::service::{self, collapse_to_auth_failure};
use super::token::issue_access_token;

#[utoipa::path(
    post,
    path = "/auth/register",
    summary = "注册新用户",
    description = "校验表单、检查用户名/邮箱唯一性（用户名优先）、哈希密码并写入用户。返回剔除敏感字段的用户视图。",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "注册成功", body = RegisterResponse),
        (status = 409, description = "用户名或邮箱已被占用", body = crate::error::ProblemDetails, content_type = "application/problem+json"),
        (status = 422, description = "表单校验失败", body = crate::error::ProblemDetails, content_type = "application/problem+json"),
        (status = 401, description = "注册失败（内部细节已隐藏）", body = crate::error::ProblemDetails, content_type = "application/problem+json")
    ),
    tag = "Auth"
)]
pub async fn post_register(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = service::register_user(&*state.storage, state.auth.pbkdf2_rounds, payload)
        .await
        .map_err(collapse_to_auth_failure)?;

    let filtered = FilteredUser::from(&user);
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    tracing::info!(
        "User {} registered successfully | ID: {} | Email: {} | IP Address: {}",
        filtered.username,
        filtered.userid,
        filtered.email,
        ip.as_deref().unwrap_or("unknown")
    );

    Ok((StatusCode::OK, Json(RegisterResponse { user: filtered })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "用户名密码登录",
    description = "校验密码并签发 Bearer 访问令牌（HS256 JWT）。",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = LoginResponse),
        (status = 401, description = "用户名或密码错误", body = crate::error::ProblemDetails, content_type = "application/problem+json")
    ),
    tag = "Auth"
)]
pub async fn post_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let user = service::authenticate(&*state.storage, &payload.username, &payload.password).await?;
    let (access_token, expires_in) = issue_access_token(&state.auth, &user)?;
    tracing::debug!("User {} logged in | ID: {}", user.username, user.userid);

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: FilteredUser::from(&user),
        }),
    ))
}

pub fn create_auth_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/register", post(post_register))
        .route("/auth/login", post(post_login))
}
