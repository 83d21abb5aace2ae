//! 基地存档解析：决定调用方应看到哪一份存档。
use std::future::Future;

use crate::error::AppError;
use crate::features::auth::models::User;

use super::models::{BaseMode, Save, UserWithSave};
use super::reward::RewardBalancer;

/// 存档存储能力
pub trait SaveStore: Send + Sync {
    /// 加载用户及其存档（一次性装载关联关系）
    fn load_user_with_save(
        &self,
        userid: i64,
    ) -> impl Future<Output = Result<Option<UserWithSave>, AppError>> + Send;

    fn find_save_by_baseid(
        &self,
        baseid: i64,
    ) -> impl Future<Output = Result<Option<Save>, AppError>> + Send;

    /// 为用户创建并持久化默认存档
    fn create_default_save(&self, user: &User)
    -> impl Future<Output = Result<Save, AppError>> + Send;

    fn persist_save(&self, save: &Save) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSave {
    pub save: Save,
    /// 是否为调用方自己的存档
    pub own: bool,
}

/// 按以下顺序解析：
/// 1. 无存档：创建默认存档并返回（不做奖励平衡）
/// 2. `default` 或与自有 baseid 相等：对自有存档做奖励平衡后返回
/// 3. 其它 baseid：按 baseid 查找他人存档并原样返回，不存在则 NotFound
pub async fn resolve_base_save<S, B>(
    store: &S,
    balancer: &B,
    user: UserWithSave,
    baseid: &str,
) -> Result<ResolvedSave, AppError>
where
    S: SaveStore,
    B: RewardBalancer + ?Sized,
{
    let UserWithSave { user, save } = user;

    let Some(mut own) = save else {
        let created = store.create_default_save(&user).await?;
        tracing::info!(
            "Created default base {} for user {} ({})",
            created.baseid,
            user.username,
            user.userid
        );
        return Ok(ResolvedSave {
            save: created,
            own: true,
        });
    };

    // 比较的是整数值而非字符串
    let foreign_target = match baseid.parse::<BaseMode>()? {
        BaseMode::Default => None,
        BaseMode::Base(id) if id == own.baseid => None,
        BaseMode::Base(id) => Some(id),
    };

    let Some(target) = foreign_target else {
        if balancer.balance(&mut own) {
            own.updated_at = chrono::Utc::now().timestamp();
            store.persist_save(&own).await?;
        }
        return Ok(ResolvedSave {
            save: own,
            own: true,
        });
    };

    match store.find_save_by_baseid(target).await? {
        Some(foreign) => {
            tracing::debug!("User {} visiting base {}", user.userid, foreign.baseid);
            Ok(ResolvedSave {
                own: foreign.userid == user.userid,
                save: foreign,
            })
        }
        None => Err(AppError::NotFound(format!(
            "Base save not found for baseid: {baseid}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardRule;
    use crate::features::base::reward::LevelRewardBalancer;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySaves {
        saves: Mutex<Vec<Save>>,
        persisted: Mutex<usize>,
    }

    impl MemorySaves {
        fn with(saves: Vec<Save>) -> Self {
            Self {
                saves: Mutex::new(saves),
                ..Default::default()
            }
        }

        fn persisted(&self) -> usize {
            *self.persisted.lock().unwrap()
        }

        fn get(&self, baseid: i64) -> Option<Save> {
            self.saves
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.baseid == baseid)
                .cloned()
        }
    }

    impl SaveStore for MemorySaves {
        async fn load_user_with_save(&self, _userid: i64) -> Result<Option<UserWithSave>, AppError> {
            Ok(None)
        }

        async fn find_save_by_baseid(&self, baseid: i64) -> Result<Option<Save>, AppError> {
            Ok(self.get(baseid))
        }

        async fn create_default_save(&self, user: &User) -> Result<Save, AppError> {
            let mut saves = self.saves.lock().unwrap();
            let save = Save {
                baseid: 1000 + saves.len() as i64,
                userid: user.userid,
                basename: format!("{}'s base", user.username),
                level: 1,
                resources: serde_json::json!({}),
                rewards: Vec::new(),
                created_at: 0,
                updated_at: 0,
            };
            saves.push(save.clone());
            Ok(save)
        }

        async fn persist_save(&self, save: &Save) -> Result<(), AppError> {
            let mut saves = self.saves.lock().unwrap();
            if let Some(slot) = saves.iter_mut().find(|s| s.baseid == save.baseid) {
                *slot = save.clone();
            }
            *self.persisted.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn user(userid: i64) -> User {
        User {
            userid,
            username: format!("user{userid}"),
            email: format!("user{userid}@x.io"),
            password: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn save(baseid: i64, userid: i64, level: i32) -> Save {
        Save {
            baseid,
            userid,
            basename: format!("base {baseid}"),
            level,
            resources: serde_json::json!({"r1": 5}),
            rewards: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn balancer() -> LevelRewardBalancer {
        LevelRewardBalancer::new(vec![RewardRule {
            reward: "korath".into(),
            min_level: 40,
        }])
    }

    #[tokio::test]
    async fn user_without_save_gets_fresh_default_for_any_baseid() {
        for requested in ["default", "42", "not-a-number"] {
            let store = MemorySaves::default();
            let input = UserWithSave {
                user: user(1),
                save: None,
            };
            let out = resolve_base_save(&store, &balancer(), input, requested)
                .await
                .expect("default save");
            assert!(out.own);
            assert_eq!(out.save.userid, 1);
            assert!(out.save.rewards.is_empty());
            assert_eq!(store.get(out.save.baseid), Some(out.save.clone()));
            assert_eq!(store.persisted(), 0);
        }
    }

    #[tokio::test]
    async fn own_save_is_balanced_via_default_or_matching_id() {
        for requested in ["default", "42", "0042"] {
            let own = save(42, 1, 50);
            let store = MemorySaves::with(vec![own.clone()]);
            let input = UserWithSave {
                user: user(1),
                save: Some(own),
            };
            let out = resolve_base_save(&store, &balancer(), input, requested)
                .await
                .expect("own save");
            assert!(out.own);
            assert_eq!(out.save.baseid, 42);
            assert_eq!(out.save.rewards, vec!["korath"]);
            assert_eq!(store.persisted(), 1);
            assert_eq!(store.get(42).unwrap().rewards, vec!["korath"]);
        }
    }

    #[tokio::test]
    async fn unchanged_own_save_is_not_persisted() {
        let own = save(42, 1, 3);
        let store = MemorySaves::with(vec![own.clone()]);
        let input = UserWithSave {
            user: user(1),
            save: Some(own.clone()),
        };
        let out = resolve_base_save(&store, &balancer(), input, "default")
            .await
            .unwrap();
        assert_eq!(out.save, own);
        assert_eq!(store.persisted(), 0);
    }

    #[tokio::test]
    async fn foreign_save_is_returned_unmodified() {
        let own = save(42, 1, 50);
        let foreign = save(99, 2, 50);
        let store = MemorySaves::with(vec![own.clone(), foreign.clone()]);
        let input = UserWithSave {
            user: user(1),
            save: Some(own),
        };
        let out = resolve_base_save(&store, &balancer(), input, "99")
            .await
            .expect("foreign save");
        assert!(!out.own);
        assert_eq!(out.save, foreign);
        assert!(out.save.rewards.is_empty());
        assert_eq!(store.persisted(), 0);
    }

    #[tokio::test]
    async fn missing_foreign_save_is_not_found() {
        let own = save(42, 1, 1);
        let store = MemorySaves::with(vec![own.clone()]);
        let input = UserWithSave {
            user: user(1),
            save: Some(own),
        };
        let err = resolve_base_save(&store, &balancer(), input, "100")
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(msg) => assert!(msg.contains("100"), "{msg}"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_baseid_is_rejected_when_save_exists() {
        let own = save(42, 1, 1);
        let store = MemorySaves::with(vec![own.clone()]);
        let input = UserWithSave {
            user: user(1),
            save: Some(own),
        };
        let err = resolve_base_save(&store, &balancer(), input, "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
