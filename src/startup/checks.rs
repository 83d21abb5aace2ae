use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::AppError;

/// 执行启动检查
///
/// 1. 检查并创建数据库所在目录
/// 2. 检查 JWT 密钥是否已配置（仅告警，不阻断启动）
pub fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");

    ensure_database_dir(&config.database_path())?;

    if config.auth.resolve_jwt_secret().is_none() {
        tracing::warn!("⚠️ 未配置 auth.jwt_secret（或 APP_AUTH_JWT_SECRET），登录与基地接口将不可用");
    }

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 确保 SQLite 文件的父目录存在
fn ensure_database_dir(db_path: &Path) -> Result<(), AppError> {
    let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if !parent.exists() {
        tracing::warn!("📁 未找到数据库目录，正在创建: {:?}", parent);
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Internal(format!("创建数据库目录失败: {e}")))?;
        tracing::info!("✅ 数据库目录创建成功");
    } else {
        tracing::info!("✅ 数据库目录已存在");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parent_directory() {
        let root = std::env::temp_dir().join(format!("base_backend_dir_{}", uuid::Uuid::new_v4()));
        let db = root.join("nested").join("game.db");
        ensure_database_dir(&db).expect("create dir");
        assert!(root.join("nested").is_dir());
        // 再次调用应为幂等
        ensure_database_dir(&db).expect("idempotent");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn bare_file_name_needs_no_directory() {
        ensure_database_dir(Path::new("game.db")).expect("no parent");
    }
}
