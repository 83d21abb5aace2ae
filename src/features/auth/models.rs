use serde::{Deserialize, Serialize};

use crate::error::{AppError, ProblemFieldError};

/// 用户记录（存储层完整字段，含密码哈希，禁止直接序列化给客户端）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub userid: i64,
    pub username: String,
    pub email: String,
    /// 密码哈希
    pub password: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 新用户入库参数
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub now_ts: i64,
}

/// 对外暴露的用户视图（剔除敏感字段）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilteredUser {
    #[schema(example = 1)]
    pub userid: i64,
    #[schema(example = "commander")]
    pub username: String,
    #[schema(example = "commander@example.com")]
    pub email: String,
    /// 注册时间（Unix 秒）
    pub created_at: i64,
}

impl From<&User> for FilteredUser {
    fn from(user: &User) -> Self {
        Self {
            userid: user.userid,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// 注册请求
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "commander")]
    pub username: String,
    #[schema(example = "commander@example.com")]
    pub email: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

/// 校验通过后的注册输入（用户名/邮箱已规整）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

impl RegisterRequest {
    /// 按注册表单规则校验，一次性返回全部字段错误。
    pub fn validate(self) -> Result<ValidRegistration, AppError> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_ascii_lowercase();
        let mut errors = Vec::new();

        let ulen = username.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&ulen) {
            errors.push(ProblemFieldError::new(
                "username",
                format!("must be {USERNAME_MIN}-{USERNAME_MAX} characters"),
            ));
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.push(ProblemFieldError::new(
                "username",
                "may only contain letters, digits, '_' and '-'",
            ));
        }

        if email.len() > EMAIL_MAX || !is_plausible_email(&email) {
            errors.push(ProblemFieldError::new("email", "must be a valid email address"));
        }

        let plen = self.password.chars().count();
        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&plen) {
            errors.push(ProblemFieldError::new(
                "password",
                format!("must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"),
            ));
        }

        if !errors.is_empty() {
            return Err(AppError::InvalidFields(errors));
        }
        Ok(ValidRegistration {
            username,
            email,
            password: self.password,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// 注册成功响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub user: FilteredUser,
}

/// 登录请求
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "commander")]
    pub username: String,
    pub password: String,
}

/// 登录成功响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// 有效期（秒）
    pub expires_in: u64,
    pub user: FilteredUser,
}
