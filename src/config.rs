use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 未设置时生效）
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 文件路径
    #[serde(default = "DatabaseConfig::default_sqlite_path")]
    pub sqlite_path: String,
    /// 是否启用 WAL
    #[serde(default = "DatabaseConfig::default_sqlite_wal")]
    pub sqlite_wal: bool,
}

impl DatabaseConfig {
    fn default_sqlite_path() -> String {
        "./resources/game.db".to_string()
    }
    fn default_sqlite_wal() -> bool {
        true
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: Self::default_sqlite_path(),
            sqlite_wal: Self::default_sqlite_wal(),
        }
    }
}

/// 账号与令牌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT 签名密钥（为空时回退到环境变量 APP_AUTH_JWT_SECRET）
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "AuthConfig::default_audience")]
    pub jwt_audience: String,
    /// 访问令牌有效期（秒）
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_secs: u64,
    /// PBKDF2 迭代次数
    #[serde(default = "AuthConfig::default_pbkdf2_rounds")]
    pub pbkdf2_rounds: u32,
}

impl AuthConfig {
    fn default_issuer() -> String {
        "base-backend".to_string()
    }
    fn default_audience() -> String {
        "base-client".to_string()
    }
    fn default_token_ttl() -> u64 {
        24 * 3600
    }
    fn default_pbkdf2_rounds() -> u32 {
        600_000
    }

    /// 解析实际使用的 JWT 密钥：配置优先，其次环境变量。
    pub fn resolve_jwt_secret(&self) -> Option<String> {
        if !self.jwt_secret.trim().is_empty() {
            return Some(self.jwt_secret.clone());
        }
        std::env::var("APP_AUTH_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: Self::default_issuer(),
            jwt_audience: Self::default_audience(),
            token_ttl_secs: Self::default_token_ttl(),
            pbkdf2_rounds: Self::default_pbkdf2_rounds(),
        }
    }
}

/// 默认存档配置（用户首次加载基地时创建）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// 默认存档等级
    #[serde(default = "BaseConfig::default_level")]
    pub default_level: i32,
    /// 默认资源表
    #[serde(default = "BaseConfig::default_resources")]
    pub default_resources: serde_json::Value,
}

impl BaseConfig {
    fn default_level() -> i32 {
        1
    }
    fn default_resources() -> serde_json::Value {
        serde_json::json!({ "r1": 0, "r2": 0, "r3": 0, "r4": 0 })
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            default_level: Self::default_level(),
            default_resources: Self::default_resources(),
        }
    }
}

/// 单条奖励规则：等级达到 `min_level` 时持有 `reward`，否则撤销。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardRule {
    pub reward: String,
    pub min_level: i32,
}

/// 奖励平衡配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "RewardsConfig::default_rules")]
    pub rules: Vec<RewardRule>,
}

impl RewardsConfig {
    fn default_rules() -> Vec<RewardRule> {
        vec![RewardRule {
            reward: "korath".to_string(),
            min_level: 40,
        }]
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            rules: Self::default_rules(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub base: BaseConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省，此时全部使用默认值
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER__PORT
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;

        tracing::debug!(
            "配置加载完成: sqlite_path = {}, jwt_secret 已配置 = {}",
            config.database.sqlite_path,
            config.auth.resolve_jwt_secret().is_some()
        );

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径（可用 APP_CONFIG_FILE 覆盖）
    fn get_config_path() -> PathBuf {
        std::env::var("APP_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.sqlite_path)
    }
}
