//! 密码哈希（PBKDF2-HMAC-SHA256，随机盐），以 PHC 字符串存储：
//! `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`。
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use crate::error::AppError;

const HASH_LEN: usize = 32;

/// 低于该迭代次数的配置会被抬升，避免误配置导致弱哈希。
pub const MIN_ROUNDS: u32 = 1_000;

/// 计算密码哈希（CPU 密集，异步上下文请使用 [`hash_password_blocking`]）。
pub fn hash_password(password: &str, rounds: u32) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params {
        rounds: rounds.max(MIN_ROUNDS),
        output_length: HASH_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| AppError::Internal(format!("计算密码哈希失败: {e}")))?;
    Ok(hash.to_string())
}

/// 校验密码；存储串不是合法的 PBKDF2 PHC 串时视为不匹配。
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok()
}

/// 在 blocking 线程池中计算哈希，避免阻塞 async worker。
pub async fn hash_password_blocking(password: String, rounds: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, rounds)).await?
}

/// 在 blocking 线程池中校验密码。
pub async fn verify_password_blocking(password: String, stored: String) -> Result<bool, AppError> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?)
}
