//! Eliza - 对话智能体 HTTP 服务
//!
//! 入口：初始化日志、加载配置、构建 Agent，并在 [server] 指定地址上提供 HTTP 接口。

use std::sync::Arc;

use anyhow::Context;
use eliza::{
    config::load_config,
    core::AgentBuilder,
    integrations::http::{create_router, AppState},
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);

    let agent = AgentBuilder::new(cfg).build().context("Failed to build agent")?;
    tracing::info!(tools = ?agent.tool_names(), "agent ready");

    let app = create_router(Arc::new(AppState::new(Arc::new(agent))));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Eliza listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
