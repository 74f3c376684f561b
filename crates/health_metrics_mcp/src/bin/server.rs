use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use health_metrics_core::{CalorieSummary, Config, InMemoryStore, SummaryStats};
use health_metrics_mcp::types::{
    CalorieParams, HistoryParams, HistoryResult, RecordAchievementParams, RecordAchievementResult,
    SummarizeParams,
};
use health_metrics_mcp::{
    HealthMetricsMcpHandler, LogNotifier, McpError, NutritionService, summarize_params,
};

struct AppState {
    service: NutritionService,
    metrics: PrometheusHandle,
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn summarize(
    Json(params): Json<SummarizeParams>,
) -> Result<Json<SummaryStats>, (StatusCode, String)> {
    summarize_params(params).map(Json).map_err(map_err)
}

#[debug_handler]
async fn nutrition_summary(
    State(state): State<Arc<AppState>>,
    Json(p): Json<CalorieParams>,
) -> Json<CalorieSummary> {
    Json(
        state
            .service
            .calorie_summary(p.consumed_calories, p.burned_calories, p.target_calories)
            .await,
    )
}

#[debug_handler]
async fn record_achievement(
    State(state): State<Arc<AppState>>,
    Json(p): Json<RecordAchievementParams>,
) -> Result<Json<RecordAchievementResult>, (StatusCode, String)> {
    state.service.record(p).await.map(Json).map_err(map_err)
}

#[debug_handler]
async fn achievement_history(
    State(state): State<Arc<AppState>>,
    Query(p): Query<HistoryParams>,
) -> Result<Json<HistoryResult>, (StatusCode, String)> {
    state.service.history(p.limit).await.map(Json).map_err(map_err)
}

fn map_err(e: McpError) -> (StatusCode, String) {
    match e {
        McpError::Metrics(health_metrics_core::MetricsError::PersistenceUnavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        _ if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}


#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Configure logging from env var `HEALTH_METRICS_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = health_metrics_mcp::log_level();
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "health_metrics_mcp:http: log filter");

    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    health_metrics_core::observability::describe_metrics();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let service = NutritionService::new(config, Arc::new(InMemoryStore::new()), Arc::new(LogNotifier));
    let state = Arc::new(AppState {
        service: service.clone(),
        metrics: handle.clone(),
    });

    let max_body_size = std::env::var("MAX_HTTP_BODY_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10 * 1024 * 1024);

    // Build rmcp StreamableHttpService mounted at /mcp; sessions share the service's store.
    let handler = HealthMetricsMcpHandler::with_service(service);
    let factory = move || -> Result<_, std::io::Error> { Ok(handler.clone()) };
    let session = std::sync::Arc::new(
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default(),
    );
    let mcp_service = rmcp::transport::streamable_http_server::tower::StreamableHttpService::new(
        factory,
        session,
        rmcp::transport::streamable_http_server::tower::StreamableHttpServerConfig::default(),
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/summarize", post(summarize))
        .route("/nutrition/summary", post(nutrition_summary))
        .route(
            "/achievements",
            post(record_achievement).get(achievement_history),
        )
        .nest_service("/mcp", mcp_service)
        .layer(axum::extract::DefaultBodyLimit::max(max_body_size))
        .with_state(state.clone());

    let addr: SocketAddr = std::env::var("ADDRESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
    info!(%addr, max_body_bytes = max_body_size, "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
