use std::sync::Arc;

use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, GetPromptRequestParams, GetPromptResult, ListPromptsResult, ListResourcesResult,
    PaginatedRequestParams, RawResource, ReadResourceRequestParams, ReadResourceResult,
    ResourceContents,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use rmcp::{prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router};

use health_metrics_core::{
    CalorieSummary, Config, DailyReducer, KeyValueStore, NotificationDispatcher, NutritionTarget,
    SummaryStats, WindowToken, dashboard_series, newest_first, normalize_json, select_window,
    summarize, summarize_metric,
};

pub mod error;
pub mod notifier;
mod prompts;
pub mod services;
pub mod types;

pub use error::{McpError, McpResult};
pub use notifier::LogNotifier;
pub use services::NutritionService;
use types::*;

const TARGET_RESOURCE_URI: &str = "health-metrics://user/nutrition-target";

/// Log filter from `HEALTH_METRICS_LOG_LEVEL`, then `RUST_LOG`, then `info`.
pub fn log_level() -> String {
    log_level_with(|k| std::env::var(k).ok())
}

/// [`log_level`] with an injectable lookup. Blank values are skipped.
pub fn log_level_with<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    get("HEALTH_METRICS_LOG_LEVEL")
        .filter(|v| !v.trim().is_empty())
        .or_else(|| get("RUST_LOG").filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "info".to_string())
}

#[derive(Clone)]
pub struct HealthMetricsMcpHandler {
    service: NutritionService,
    tool_router: rmcp::handler::server::tool::ToolRouter<HealthMetricsMcpHandler>,
    prompt_router: rmcp::handler::server::router::prompt::PromptRouter<HealthMetricsMcpHandler>,
}

#[tool_router]
#[prompt_router]
impl HealthMetricsMcpHandler {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self::with_service(NutritionService::new(config, store, notifier))
    }

    pub fn with_service(service: NutritionService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn service(&self) -> &NutritionService {
        &self.service
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    #[tool(
        name = "normalize_records",
        description = "Convert raw log entries into canonical metric records; malformed entries are skipped and counted"
    )]
    async fn normalize_records(
        &self,
        params: Parameters<NormalizeParams>,
    ) -> Result<Json<NormalizeResult>, String> {
        let p = params.0;
        let offset = self.service.offset(p.utc_offset.as_deref())?;
        let report = normalize_json(&p.records, offset);
        Ok(Json(NormalizeResult {
            records: report.records,
            dropped: report.dropped,
        }))
    }

    #[tool(
        name = "aggregate_daily",
        description = "Reduce raw log entries to one value per metric per local calendar day"
    )]
    async fn aggregate_daily(
        &self,
        params: Parameters<AggregateParams>,
    ) -> Result<Json<AggregateResult>, String> {
        let p = params.0;
        let offset = self.service.offset(p.utc_offset.as_deref())?;
        let now = self.service.reference_instant(p.now.as_deref(), offset)?;
        let report = normalize_json(&p.records, offset);

        let mut reducer = DailyReducer::new(now);
        for (kind, value) in p.live_overrides.unwrap_or_default() {
            reducer = reducer.with_live_override(kind, value);
        }
        let days = match p.kind {
            Some(kind) => reducer.reduce(&report.records, kind),
            None => reducer.reduce_all(&report.records),
        };
        let days = if p.newest_first.unwrap_or(false) {
            newest_first(days)
        } else {
            days
        };
        Ok(Json(AggregateResult {
            days,
            dropped: report.dropped,
        }))
    }

    #[tool(
        name = "bucket_period",
        description = "Group daily aggregates into daily, ISO-weekly or monthly buckets (mean per metric), optionally limited to a window"
    )]
    async fn bucket_period(
        &self,
        params: Parameters<BucketParams>,
    ) -> Result<Json<BucketResult>, String> {
        let p = params.0;
        let buckets = match p.window {
            Some(window) => {
                let offset = self.service.config().utc_offset;
                let now = self.service.reference_instant(p.now.as_deref(), offset)?;
                dashboard_series(&p.days, p.granularity, window, now)
            }
            None => health_metrics_core::bucket_period(&p.days, p.granularity),
        };
        Ok(Json(BucketResult { buckets }))
    }

    #[tool(
        name = "select_window",
        description = "Keep daily aggregates dated within the window (7d, 30d, 3m, 6m, 12m) ending now"
    )]
    async fn select_window(
        &self,
        params: Parameters<SelectWindowParams>,
    ) -> Result<Json<SelectWindowResult>, String> {
        let p = params.0;
        let offset = self.service.config().utc_offset;
        let now = self.service.reference_instant(p.now.as_deref(), offset)?;
        Ok(Json(SelectWindowResult {
            days: select_window(&p.days, p.window, now),
        }))
    }

    #[tool(
        name = "summarize",
        description = "Current, lowest, highest, average and change for a chronological series"
    )]
    async fn summarize(
        &self,
        params: Parameters<SummarizeParams>,
    ) -> Result<Json<SummaryStats>, String> {
        summarize_params(params.0).map(Json).map_err(String::from)
    }

    #[tool(
        name = "derive_nutrition_summary",
        description = "Net calories, remaining and progress against the calorie target"
    )]
    async fn derive_nutrition_summary(
        &self,
        params: Parameters<CalorieParams>,
    ) -> Result<Json<CalorieSummary>, String> {
        let p = params.0;
        Ok(Json(
            self.service
                .calorie_summary(p.consumed_calories, p.burned_calories, p.target_calories)
                .await,
        ))
    }

    #[tool(
        name = "nutrition_dashboard",
        description = "Today's nutrition summary from raw logs; caches the day's snapshot and records the daily achievement"
    )]
    async fn nutrition_dashboard(
        &self,
        params: Parameters<DashboardParams>,
    ) -> Result<Json<DashboardResult>, String> {
        self.service
            .dashboard(params.0)
            .await
            .map(Json)
            .map_err(String::from)
    }

    #[tool(name = "get_nutrition_target", description = "Get the user's nutrition target")]
    async fn get_nutrition_target(&self) -> Result<Json<TargetResult>, String> {
        let target = self.service.target().await?;
        Ok(Json(TargetResult { target }))
    }

    #[tool(
        name = "set_nutrition_target",
        description = "Set calorie and macro goals; omitted fields are cleared"
    )]
    async fn set_nutrition_target(
        &self,
        params: Parameters<NutritionTarget>,
    ) -> Result<Json<NutritionTarget>, String> {
        self.service
            .set_target(params.0)
            .await
            .map(Json)
            .map_err(String::from)
    }

    #[tool(
        name = "record_achievement",
        description = "Decide whether the day's nutrition goal was met and record it once per date"
    )]
    async fn record_achievement(
        &self,
        params: Parameters<RecordAchievementParams>,
    ) -> Result<Json<RecordAchievementResult>, String> {
        self.service
            .record(params.0)
            .await
            .map(Json)
            .map_err(String::from)
    }

    #[tool(
        name = "get_achievement_history",
        description = "Recorded daily achievements, newest first"
    )]
    async fn get_achievement_history(
        &self,
        params: Parameters<HistoryParams>,
    ) -> Result<Json<HistoryResult>, String> {
        self.service
            .history(params.0.limit)
            .await
            .map(Json)
            .map_err(String::from)
    }

    // === MCP Prompts ===

    #[prompt(
        name = "progress-review",
        description = "Review the trend of one body or activity metric over a window"
    )]
    async fn progress_review(&self, params: Parameters<ProgressReviewParams>) -> GetPromptResult {
        let window = params
            .0
            .window
            .as_deref()
            .and_then(|w| w.parse::<WindowToken>().ok())
            .unwrap_or(WindowToken::Days30);
        let metric = params.0.metric.unwrap_or_else(|| "weight".to_string());

        prompts::progress_review_prompt(window.as_str(), &metric)
    }

    #[prompt(
        name = "nutrition-check",
        description = "Check a day's calories and macros against the nutrition target"
    )]
    async fn nutrition_check(&self, params: Parameters<NutritionCheckParams>) -> GetPromptResult {
        let date = params.0.date.unwrap_or_else(|| "today".to_string());
        let target = self.service.target().await.ok().flatten();

        prompts::nutrition_check_prompt(&date, target.as_ref())
    }
}

/// Summary over explicit values, or over `kind` read from daily aggregates.
pub fn summarize_params(p: SummarizeParams) -> McpResult<SummaryStats> {
    match (p.values, p.days, p.kind) {
        (Some(values), _, _) => Ok(summarize(&values)),
        (None, Some(days), Some(kind)) => Ok(summarize_metric(&days, kind)),
        (None, Some(_), None) => Err(McpError::Validation(
            "kind is required when summarizing days".into(),
        )),
        (None, None, _) => Err(McpError::Validation("values or days required".into())),
    }
}

#[tool_handler]
#[prompt_handler(router = self.prompt_router)]
impl rmcp::ServerHandler for HealthMetricsMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
        )
        .with_instructions(
            "Health metrics MCP server - normalizes body, nutrition, hydration and \
             activity logs, aggregates them into daily/weekly/monthly series, and \
             tracks the daily nutrition goal.",
        )
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resource = RawResource::new(TARGET_RESOURCE_URI, "Nutrition Target");

        let mut res = resource.no_annotation();
        res.description = Some("The user's calorie and macro goals".to_string());
        res.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![res],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != TARGET_RESOURCE_URI {
            return Err(ErrorData::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ));
        }
        let target = self
            .service
            .target()
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let text = serde_json::to_string_pretty(&TargetResult { target })
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult::new(vec![ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            }]))
    }
}
