use std::sync::Arc;

use crate::config::AuthConfig;
use crate::features::base::RewardBalancer;
use crate::storage::GameStorage;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<GameStorage>,
    /// 自有存档加载时应用的奖励平衡策略
    pub balancer: Arc<dyn RewardBalancer>,
    pub auth: Arc<AuthConfig>,
}
