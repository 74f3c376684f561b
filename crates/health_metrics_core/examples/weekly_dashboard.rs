use chrono::Utc;
use health_metrics_core::{
    Config, DailyReducer, Granularity, MetricKind, WindowToken, dashboard_series, normalize_json,
    summarize_metric,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads a JSON array of raw log entries from the path given as the first
    // argument; expects HEALTH_METRICS_USER_ID in env.
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(());
        }
    };
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: weekly_dashboard <records.json>");
        return Ok(());
    };
    let raw: Vec<serde_json::Value> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let report = normalize_json(&raw, cfg.utc_offset);
    let now = Utc::now().with_timezone(&cfg.utc_offset);
    let daily = DailyReducer::new(now).reduce_all(&report.records);

    println!("user {} ({} dropped)", cfg.user_id, report.dropped);
    for kind in [MetricKind::Weight, MetricKind::Calories, MetricKind::Steps] {
        let weekly = dashboard_series(&daily, Granularity::Weekly, WindowToken::Months3, now);
        let stats = summarize_metric(&weekly, kind);
        println!(
            "{kind}: current {} avg {} change {:+}",
            stats.current, stats.average, stats.change
        );
    }
    Ok(())
}
