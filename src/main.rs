use std::net::SocketAddr;
use std::sync::Arc;

use base_backend::{
    AppConfig, ShutdownManager, build_app,
    features::base::LevelRewardBalancer,
    startup::run_startup_checks,
    state::AppState,
    storage::GameStorage,
};

#[tokio::main]
async fn main() {
    // 先读配置，日志级别以 RUST_LOG 为准，其次 logging.level
    if let Err(e) = AppConfig::init_global() {
        eprintln!("Config init failed: {e}");
        std::process::exit(1);
    }
    let config = AppConfig::global();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("base_backend={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_startup_checks(config) {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    let storage = match GameStorage::connect_sqlite(
        &config.database.sqlite_path,
        config.database.sqlite_wal,
    )
    .await
    {
        Ok(s) => s.with_base_defaults(config.base.clone()),
        Err(e) => {
            tracing::error!("Database init failed: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = storage.init_schema().await {
        tracing::error!("Database schema init failed: {}", e);
        std::process::exit(1);
    }
    tracing::info!("SQLite ready: {}", config.database.sqlite_path);

    let app_state = AppState {
        storage: Arc::new(storage),
        balancer: Arc::new(LevelRewardBalancer::from_config(&config.rewards)),
        auth: Arc::new(config.auth.clone()),
    };
    let app = build_app(app_state, config);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Auth API: http://{}{}/auth", addr, config.api.prefix);
    tracing::info!("Base API: http://{}{}/base/load", addr, config.api.prefix);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let shutdown_signal = {
        let manager = shutdown_manager.clone();
        async move {
            let reason = manager.wait_for_shutdown().await;
            tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
        }
    };

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal);

    // 收到退出信号后，最多再等待 shutdown.timeout_secs 让在途请求结束
    let forced = async {
        shutdown_manager.wait_for_shutdown().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        res = server.into_future() => {
            if let Err(e) = res {
                tracing::error!("服务器运行错误: {}", e);
                std::process::exit(1);
            }
            tracing::info!("服务器已优雅关闭");
        }
        _ = forced => {
            tracing::warn!("优雅退出超时（{}秒），强制退出", config.shutdown.timeout_secs);
        }
    }
}
