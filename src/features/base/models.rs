use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::auth::models::User;

/// 基地存档记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Save {
    /// 基地 ID（存储层分配，稳定且唯一）
    #[schema(example = 1024)]
    pub baseid: i64,
    /// 所属用户
    pub userid: i64,
    #[schema(example = "commander's base")]
    pub basename: String,
    pub level: i32,
    /// 资源表（不透明 JSON）
    #[schema(value_type = Object)]
    pub resources: serde_json::Value,
    /// 已发放的奖励键，保持发放顺序
    pub rewards: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Save {
    pub fn has_reward(&self, reward: &str) -> bool {
        self.rewards.iter().any(|r| r == reward)
    }
}

/// 用户及其（可能缺失的）存档，由存储层一次性加载
#[derive(Debug, Clone)]
pub struct UserWithSave {
    pub user: User,
    pub save: Option<Save>,
}

pub const DEFAULT_BASE_TOKEN: &str = "default";

/// 请求的基地目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMode {
    /// 自己的存档
    Default,
    /// 指定 baseid 的存档（可能是自己的，也可能是他人的）
    Base(i64),
}

impl FromStr for BaseMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == DEFAULT_BASE_TOKEN {
            return Ok(BaseMode::Default);
        }
        raw.parse::<i64>().map(BaseMode::Base).map_err(|_| {
            AppError::Validation(format!(
                "baseid 必须为整数或 \"{DEFAULT_BASE_TOKEN}\"，收到: {raw}"
            ))
        })
    }
}

/// `baseid` 参数：接受字符串或 JSON 数字
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BaseIdParam {
    Text(String),
    Number(i64),
}

impl BaseIdParam {
    pub fn into_text(self) -> String {
        match self {
            BaseIdParam::Text(s) => s,
            BaseIdParam::Number(n) => n.to_string(),
        }
    }
}

/// 基地加载请求
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBaseRequest {
    /// 目标基地：`"default"` 或 baseid
    #[schema(value_type = String, example = "default")]
    pub baseid: BaseIdParam,
}

/// 基地加载响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoadBaseResponse {
    pub save: Save,
    /// 返回的存档是否属于调用方
    pub own: bool,
}
