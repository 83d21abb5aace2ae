use crate::config::{RewardRule, RewardsConfig};

use super::models::Save;

/// 奖励平衡：根据存档当前状态调整其奖励发放情况。返回是否发生变更。
pub trait RewardBalancer: Send + Sync {
    fn balance(&self, save: &mut Save) -> bool;
}

/// 按等级门槛发放/撤销奖励
#[derive(Debug, Clone, Default)]
pub struct LevelRewardBalancer {
    rules: Vec<RewardRule>,
}

impl LevelRewardBalancer {
    pub fn new(rules: Vec<RewardRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(cfg: &RewardsConfig) -> Self {
        Self::new(cfg.rules.clone())
    }
}

impl RewardBalancer for LevelRewardBalancer {
    fn balance(&self, save: &mut Save) -> bool {
        let mut changed = false;
        for rule in &self.rules {
            let eligible = save.level >= rule.min_level;
            let granted = save.has_reward(&rule.reward);
            if eligible && !granted {
                save.rewards.push(rule.reward.clone());
                changed = true;
            } else if !eligible && granted {
                save.rewards.retain(|r| r != &rule.reward);
                changed = true;
            }
        }
        if changed {
            tracing::debug!(
                "Rewards rebalanced for base {}: {:?}",
                save.baseid,
                save.rewards
            );
        }
        changed
    }
}
