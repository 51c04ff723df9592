use anyhow::Context;
use delivery_server::{Config, Server, ServerState, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载 .env
    let _ = dotenvy::dotenv();

    // 2. 加载配置 + 日志
    let config = Config::from_env();
    let _log_guard = init_logger(
        &config.log_level,
        config.is_production(),
        config.log_dir.as_deref(),
    );
    config.validate().context("invalid configuration")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.environment,
        "Delivery server starting"
    );

    // 3. 初始化服务器状态
    let state = ServerState::initialize(&config)
        .await
        .context("failed to initialize server state")?;

    // 4. 启动 HTTP 服务器
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
