use std::path::Path;

use sqlx::{ConnectOptions, Row, SqlitePool, sqlite::SqliteConnectOptions};

use crate::config::BaseConfig;
use crate::error::AppError;
use crate::features::auth::UserStore;
use crate::features::auth::models::{NewUser, User};
use crate::features::base::SaveStore;
use crate::features::base::models::{Save, UserWithSave};

/// SQLite 持久化：用户与基地存档
#[derive(Clone)]
pub struct GameStorage {
    pub pool: SqlitePool,
    base_defaults: BaseConfig,
}

fn parse_rewards_json(raw: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| AppError::Internal(format!("解析存档 rewards 失败: {e}")))
}

fn parse_resources_json(raw: &str) -> Result<serde_json::Value, AppError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|e| AppError::Internal(format!("解析存档 resources 失败: {e}")))
}

fn encode_json<T: serde::Serialize>(value: &T, label: &str) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("序列化 {label} 失败: {e}")))
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        userid: row.get("userid"),
        username: row.get("username"),
        email: row.get("email"),
        password: row.get("password"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_save(row: &sqlx::sqlite::SqliteRow) -> Result<Save, AppError> {
    let resources_raw: String = row.get("resources");
    let rewards_raw: String = row.get("rewards");
    Ok(Save {
        baseid: row.get("baseid"),
        userid: row.get("userid"),
        basename: row.get("basename"),
        level: row.get("level"),
        resources: parse_resources_json(&resources_raw)?,
        rewards: parse_rewards_json(&rewards_raw)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// 联表查询结果中 `s_` 前缀的存档列；无存档时为 None
fn joined_row_to_save(row: &sqlx::sqlite::SqliteRow) -> Result<Option<Save>, AppError> {
    let Some(baseid) = row.try_get::<Option<i64>, _>("s_baseid").ok().flatten() else {
        return Ok(None);
    };
    let resources_raw: String = row.get("s_resources");
    let rewards_raw: String = row.get("s_rewards");
    Ok(Some(Save {
        baseid,
        userid: row.get("userid"),
        basename: row.get("s_basename"),
        level: row.get("s_level"),
        resources: parse_resources_json(&resources_raw)?,
        rewards: parse_rewards_json(&rewards_raw)?,
        created_at: row.get("s_created_at"),
        updated_at: row.get("s_updated_at"),
    }))
}

/// 将唯一约束冲突映射为对应的冲突错误，其余错误视为内部错误。
fn map_user_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        let msg = db_err.message();
        if msg.contains("users.username") {
            return AppError::UsernameTaken;
        }
        if msg.contains("users.email") {
            return AppError::EmailTaken;
        }
    }
    AppError::Internal(format!("insert user: {err}"))
}

impl GameStorage {
    pub async fn connect_sqlite(path: &str, wal: bool) -> Result<Self, AppError> {
        let opt = SqliteConnectOptions::new()
            .filename(Path::new(path))
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(tracing::log::LevelFilter::Off);
        let pool = SqlitePool::connect_with(opt)
            .await
            .map_err(|e| AppError::Internal(format!("sqlite connect: {e}")))?;
        if wal {
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&pool)
                .await
                .ok();
        }
        sqlx::query("PRAGMA synchronous=NORMAL;")
            .execute(&pool)
            .await
            .ok();
        Ok(Self {
            pool,
            base_defaults: BaseConfig::default(),
        })
    }

    /// 设置新建默认存档所用的等级与资源
    pub fn with_base_defaults(mut self, base_defaults: BaseConfig) -> Self {
        self.base_defaults = base_defaults;
        self
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        let ddl = r#"
        CREATE TABLE IF NOT EXISTS users (
          userid INTEGER PRIMARY KEY AUTOINCREMENT,
          username TEXT NOT NULL UNIQUE,
          email TEXT NOT NULL UNIQUE,
          password TEXT NOT NULL,
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS saves (
          baseid INTEGER PRIMARY KEY AUTOINCREMENT,
          userid INTEGER NOT NULL UNIQUE,
          basename TEXT NOT NULL,
          level INTEGER NOT NULL DEFAULT 1,
          resources TEXT NOT NULL,
          rewards TEXT NOT NULL DEFAULT '[]',
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL,
          FOREIGN KEY (userid) REFERENCES users(userid) ON DELETE CASCADE
        );
        "#;

        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("init schema: {e}")))?;
        Ok(())
    }

    pub async fn get_save_by_userid(&self, userid: i64) -> Result<Option<Save>, AppError> {
        let row = sqlx::query("SELECT * FROM saves WHERE userid = ? LIMIT 1")
            .bind(userid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("query save by userid: {e}")))?;
        row.as_ref().map(row_to_save).transpose()
    }
}

impl UserStore for GameStorage {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT * FROM users WHERE username = ? OR email = ?
             ORDER BY CASE WHEN username = ? THEN 0 ELSE 1 END
             LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("query user by username/email: {e}")))?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ? LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("query user by username: {e}")))?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let result = sqlx::query(
            "INSERT INTO users(username, email, password, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.now_ts)
        .bind(new_user.now_ts)
        .execute(&self.pool)
        .await
        .map_err(map_user_insert_error)?;

        Ok(User {
            userid: result.last_insert_rowid(),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password_hash,
            created_at: new_user.now_ts,
            updated_at: new_user.now_ts,
        })
    }
}

impl SaveStore for GameStorage {
    async fn load_user_with_save(&self, userid: i64) -> Result<Option<UserWithSave>, AppError> {
        let row = sqlx::query(
            "SELECT u.userid, u.username, u.email, u.password, u.created_at, u.updated_at,
                    s.baseid AS s_baseid, s.basename AS s_basename, s.level AS s_level,
                    s.resources AS s_resources, s.rewards AS s_rewards,
                    s.created_at AS s_created_at, s.updated_at AS s_updated_at
             FROM users u
             LEFT JOIN saves s ON s.userid = u.userid
             WHERE u.userid = ?
             LIMIT 1",
        )
        .bind(userid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("query user with save: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserWithSave {
            user: row_to_user(&row),
            save: joined_row_to_save(&row)?,
        }))
    }

    async fn find_save_by_baseid(&self, baseid: i64) -> Result<Option<Save>, AppError> {
        let row = sqlx::query("SELECT * FROM saves WHERE baseid = ? LIMIT 1")
            .bind(baseid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("query save by baseid: {e}")))?;
        row.as_ref().map(row_to_save).transpose()
    }

    async fn create_default_save(&self, user: &User) -> Result<Save, AppError> {
        let now = chrono::Utc::now().timestamp();
        let resources = encode_json(&self.base_defaults.default_resources, "resources")?;
        // 每个用户至多一份存档；并发创建时保留先写入者
        let result = sqlx::query(
            "INSERT INTO saves(userid, basename, level, resources, rewards, created_at, updated_at)
             VALUES(?, ?, ?, ?, '[]', ?, ?)
             ON CONFLICT(userid) DO NOTHING",
        )
        .bind(user.userid)
        .bind(format!("{}'s base", user.username))
        .bind(self.base_defaults.default_level)
        .bind(&resources)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("insert default save: {e}")))?;

        if result.rows_affected() == 0 {
            tracing::warn!("Default save for user {} already exists", user.userid);
        }
        self.get_save_by_userid(user.userid)
            .await?
            .ok_or_else(|| AppError::Internal(format!("默认存档写入后未找到: userid={}", user.userid)))
    }

    async fn persist_save(&self, save: &Save) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE saves SET basename = ?, level = ?, resources = ?, rewards = ?, updated_at = ?
             WHERE baseid = ?",
        )
        .bind(&save.basename)
        .bind(save.level)
        .bind(encode_json(&save.resources, "resources")?)
        .bind(encode_json(&save.rewards, "rewards")?)
        .bind(save.updated_at)
        .bind(save.baseid)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("update save: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "存档不存在，无法写回: baseid={}",
                save.baseid
            )));
        }
        Ok(())
    }
}
