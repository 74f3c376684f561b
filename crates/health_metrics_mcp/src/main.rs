use std::sync::Arc;

use health_metrics_core::{Config, InMemoryStore};
use health_metrics_mcp::{HealthMetricsMcpHandler, LogNotifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure logging from env var `HEALTH_METRICS_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = health_metrics_mcp::log_level();

    // Append per-target overrides to keep rmcp internals quiet by default
    let combined_filter = format!("{},rmcp=warn,serve_inner=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn,serve_inner=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("health_metrics_mcp: log filter: {}", log_env);

    let config = Config::from_env()?;
    tracing::info!(
        user_id = %config.user_id,
        utc_offset = %config.utc_offset,
        default_target_calories = config.default_target_calories,
        "health_metrics_mcp: configuration loaded"
    );

    let handler = HealthMetricsMcpHandler::new(
        config,
        Arc::new(InMemoryStore::new()),
        Arc::new(LogNotifier),
    );

    tracing::info!(
        "health_metrics_mcp: registered {} tools and {} prompts",
        handler.tool_count(),
        handler.prompt_count()
    );

    tracing::info!("health_metrics_mcp: starting stdio MCP server...");

    use rmcp::serve_server;
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = serve_server(handler, transport).await?;

    tracing::info!("health_metrics_mcp: service initialized as server");

    server.waiting().await?;

    Ok(())
}
