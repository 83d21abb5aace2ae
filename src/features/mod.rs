/// 账号：注册、登录、Bearer 令牌
pub mod auth;
/// 基地存档加载与奖励平衡
pub mod base;
/// 健康检查
pub mod health;
