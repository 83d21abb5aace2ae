//! 注册与登录的业务流程，依赖抽象的 [`UserStore`]，便于替换存储实现。
use std::future::Future;

use crate::error::AppError;

use super::models::{NewUser, RegisterRequest, User};
use super::password;

/// 用户存储能力
pub trait UserStore: Send + Sync {
    /// 查找用户名或邮箱命中的用户；两者分别命中不同用户时，优先返回用户名命中者。
    fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    /// 写入新用户；唯一约束冲突需映射为 UsernameTaken / EmailTaken。
    fn create_user(&self, new_user: NewUser)
    -> impl Future<Output = Result<User, AppError>> + Send;
}

/// 注册新用户：校验 → 唯一性检查（用户名优先）→ 哈希 → 入库。
pub async fn register_user<S: UserStore>(
    store: &S,
    pbkdf2_rounds: u32,
    request: RegisterRequest,
) -> Result<User, AppError> {
    let input = request.validate()?;

    if let Some(existing) = store
        .find_by_username_or_email(&input.username, &input.email)
        .await?
    {
        if existing.username == input.username {
            return Err(AppError::UsernameTaken);
        }
        if existing.email == input.email {
            return Err(AppError::EmailTaken);
        }
    }

    let password_hash = password::hash_password_blocking(input.password, pbkdf2_rounds).await?;
    store
        .create_user(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
            now_ts: chrono::Utc::now().timestamp(),
        })
        .await
}

/// 用户名 + 密码登录。用户不存在与密码错误返回同一错误。
pub async fn authenticate<S: UserStore>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = store.find_by_username(username.trim()).await? else {
        return Err(AppError::InvalidCredentials);
    };
    let ok =
        password::verify_password_blocking(password.to_string(), user.password.clone()).await?;
    if !ok {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

/// 将非“客户端安全”的错误折叠为通用认证失败，内部细节只写日志。
pub fn collapse_to_auth_failure(err: AppError) -> AppError {
    if err.is_client_safe() {
        return err;
    }
    tracing::error!("注册失败（已对外隐藏）: {}", err);
    AppError::AuthFailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 内存实现，仅用于验证业务流程
    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<Vec<User>>,
        fail_create: bool,
    }

    impl UserStore for MemoryUsers {
        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> Result<Option<User>, AppError> {
            let users = self.users.lock().unwrap();
            let by_name = users.iter().find(|u| u.username == username);
            let by_email = users.iter().find(|u| u.email == email);
            Ok(by_name.or(by_email).cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
            if self.fail_create {
                return Err(AppError::Internal("disk full".into()));
            }
            let mut users = self.users.lock().unwrap();
            let user = User {
                userid: users.len() as i64 + 1,
                username: new_user.username,
                email: new_user.email,
                password: new_user.password_hash,
                created_at: new_user.now_ts,
                updated_at: new_user.now_ts,
            };
            users.push(user.clone());
            Ok(user)
        }
    }

    fn req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn username_collision_wins_over_email() {
        let store = MemoryUsers::default();
        register_user(&store, 1, req("alice", "alice@x.io")).await.unwrap();
        register_user(&store, 1, req("bob", "bob@x.io")).await.unwrap();

        // 用户名撞 alice，邮箱撞 bob
        let err = register_user(&store, 1, req("alice", "bob@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UsernameTaken), "got {err:?}");

        let err = register_user(&store, 1, req("alice", "other@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UsernameTaken), "got {err:?}");

        let err = register_user(&store, 1, req("carol", "ALICE@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken), "got {err:?}");
    }

    #[tokio::test]
    async fn stored_password_is_hashed_and_authenticates() {
        let store = MemoryUsers::default();
        let user = register_user(&store, 1, req("dave", "dave@x.io")).await.unwrap();
        assert_ne!(user.password, "password123");

        let ok = authenticate(&store, "dave", "password123").await.unwrap();
        assert_eq!(ok.userid, user.userid);

        let err = authenticate(&store, "dave", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let err = authenticate(&store, "nobody", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn internal_failures_collapse_to_auth_failed() {
        let store = MemoryUsers {
            fail_create: true,
            ..Default::default()
        };
        let err = register_user(&store, 1, req("erin", "erin@x.io"))
            .await
            .map_err(collapse_to_auth_failure)
            .unwrap_err();
        assert!(matches!(err, AppError::AuthFailed));

        let err = collapse_to_auth_failure(AppError::EmailTaken);
        assert!(matches!(err, AppError::EmailTaken));
    }
}
