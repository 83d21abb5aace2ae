use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 请求体 JSON 解析错误
    #[error("JSON 解析错误: {0}")]
    Json(String),

    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 字段级校验错误（注册表单等）
    #[error("参数校验错误: {}", join_field_errors(.0))]
    InvalidFields(Vec<ProblemFieldError>),

    /// 用户名已被占用
    #[error("Username is already taken")]
    UsernameTaken,

    /// 邮箱已被占用
    #[error("Email is already registered")]
    EmailTaken,

    /// 资源不存在
    #[error("{0}")]
    NotFound(String),

    /// 认证失败（对外不暴露内部细节）
    #[error("Authentication failed")]
    AuthFailed,

    /// 用户名或密码错误
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// 缺少或无效的访问令牌
    #[error("未授权: {0}")]
    Unauthorized(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

fn join_field_errors(errors: &[ProblemFieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 设计目标：
/// - 让所有 API 错误返回结构化 JSON，便于客户端稳定处理
/// - 与 OpenAPI 一致（content-type = application/problem+json）
/// - `message` + `code` 为对外稳定契约，其余字段按需附带
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Conflict")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 409)]
    pub status: u16,

    /// 人类可读的错误信息。
    #[schema(example = "Username is already taken")]
    pub message: String,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "USERNAME_TAKEN")]
    pub code: String,

    /// 可选：请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// 可选：字段级校验错误。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ProblemFieldError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemFieldError {
    /// 字段名（camelCase）。
    pub field: String,
    /// 字段错误信息。
    pub message: String,
}

impl ProblemFieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl AppError {
    /// 可直接透传给客户端的错误（其余错误对外统一折叠为 AuthFailed）。
    pub fn is_client_safe(&self) -> bool {
        matches!(
            self,
            AppError::Json(_)
                | AppError::Validation(_)
                | AppError::InvalidFields(_)
                | AppError::UsernameTaken
                | AppError::EmailTaken
                | AppError::NotFound(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) | AppError::InvalidFields(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::UsernameTaken | AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthFailed | AppError::InvalidCredentials | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::Json(_) => "BAD_REQUEST",
            AppError::Validation(_) | AppError::InvalidFields(_) => "VALIDATION_FAILED",
            AppError::UsernameTaken => "USERNAME_TAKEN",
            AppError::EmailTaken => "EMAIL_TAKEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AuthFailed => "AUTH_FAILED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::CONFLICT => "Conflict",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("请求处理失败: {}", self);
        }

        let message = match &self {
            // 内部错误不向客户端透出细节
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            message,
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
            errors: match self {
                AppError::InvalidFields(errors) => Some(errors),
                _ => None,
            },
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(format!("database: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task: {err}"))
    }
}
