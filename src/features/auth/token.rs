use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

use super::models::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// userid
    pub sub: String,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

fn jwt_secret(cfg: &AuthConfig) -> Result<String, AppError> {
    cfg.resolve_jwt_secret().ok_or_else(|| {
        AppError::Internal("auth.jwt_secret 未配置（可通过 APP_AUTH_JWT_SECRET 设置）".into())
    })
}

/// 为用户签发访问令牌，返回 (token, 有效期秒数)。
pub fn issue_access_token(cfg: &AuthConfig, user: &User) -> Result<(String, u64), AppError> {
    let ttl = cfg.token_ttl_secs.max(60);
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user.userid.to_string(),
        jti: Uuid::new_v4().to_string(),
        iss: cfg.jwt_issuer.clone(),
        aud: cfg.jwt_audience.clone(),
        iat: now,
        exp: now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)),
    };
    let secret = jwt_secret(cfg)?;
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("签发访问令牌失败: {e}")))?;
    Ok((token, ttl))
}

pub fn decode_access_token(cfg: &AuthConfig, token: &str) -> Result<AccessClaims, AppError> {
    let secret = jwt_secret(cfg)?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[cfg.jwt_issuer.as_str()]);
    validation.set_audience(&[cfg.jwt_audience.as_str()]);
    let data = jsonwebtoken::decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("访问令牌无效或已过期".into()))?;
    Ok(data.claims)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// 已通过 Bearer 令牌认证的调用方
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub userid: i64,
    pub claims: AccessClaims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("缺少 Bearer 访问令牌".into()))?;
        let claims = decode_access_token(&state.auth, token)?;
        let userid = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("访问令牌主体非法".into()))?;
        Ok(Self { userid, claims })
    }
}
