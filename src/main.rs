//! Xode Gateway 主入口
//! 区块链查询与钱包创建的 REST 网关

use std::sync::Arc;

use anyhow::{Context, Result};
use xode_gateway::{api, app_state::AppState, config::Config, infrastructure::logging};

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载 .env
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指向的 TOML 文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate().context("Invalid configuration")?;

    // ✅ 3. 初始化日志；文件日志的 guard 持有到进程退出
    let _log_guard = logging::init_logging(&config.logging)?;
    tracing::info!("🚀 Starting Xode Gateway v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        tracing::info!("Config file: {}", path);
    }

    // ✅ 4. 初始化应用状态
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    // ✅ 5. 构建路由并启动服务器
    let app = api::routes(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!("🎉 Server listening on http://{}", config.server.bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/docs", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
