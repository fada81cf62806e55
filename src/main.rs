//! OneEscrow 主入口
//! 为聊天层提供地址提交、角色选择与查询接口

use std::sync::Arc;

use anyhow::{Context, Result};
use oneescrow::{api, app_state::AppState, config::Config, infrastructure::logging};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（CONFIG_PATH 指向的 TOML 优先，缺省回落到环境变量）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate().context("Invalid configuration")?;

    // 3. 初始化日志
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        evm_candidates = ?config.resolver.candidates.evm,
        unreachable_policy = ?config.resolver.unreachable_policy,
        "Starting OneEscrow address engine"
    );

    // 4. 构建应用状态
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()).await?);

    // 5. 启动 HTTP 服务
    let app = api::routes(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(bind_addr = %config.server.bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
