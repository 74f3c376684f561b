use chrono::{DateTime, Duration, FixedOffset};
use criterion::{Criterion, criterion_group, criterion_main};
use health_metrics_core::{
    DailyReducer, Granularity, MetricKind, MetricRecord, WindowToken, dashboard_series,
};
use std::hint::black_box;

fn year_of_records() -> (Vec<MetricRecord>, DateTime<FixedOffset>) {
    let start = DateTime::parse_from_rfc3339("2024-01-01T06:00:00+00:00").expect("start");
    let mut records = Vec::with_capacity(365 * 8);
    for day in 0..365 {
        let base = start + Duration::days(day);
        records.push(MetricRecord::new(base, MetricKind::Weight, 80.0 - day as f64 * 0.01));
        for meal in 0..4 {
            let t = base + Duration::hours(meal * 4);
            records.push(MetricRecord::new(t, MetricKind::Calories, 550.0));
            records.push(MetricRecord::new(t, MetricKind::Protein, 30.0));
        }
        records.push(MetricRecord::new(base, MetricKind::Steps, 9000.0));
        records.push(MetricRecord::new(base, MetricKind::CaloriesBurned, 350.0));
    }
    (records, start + Duration::days(364) + Duration::hours(12))
}

fn bench_aggregate_daily(c: &mut Criterion) {
    let (records, now) = year_of_records();
    let reducer = DailyReducer::new(now);

    c.bench_function("reduce_all_one_year", |b| {
        b.iter(|| reducer.reduce_all(black_box(&records)))
    });

    let daily = reducer.reduce_all(&records);
    c.bench_function("weekly_dashboard_12m", |b| {
        b.iter(|| {
            dashboard_series(
                black_box(&daily),
                Granularity::Weekly,
                WindowToken::Months12,
                now,
            )
        })
    });
}

criterion_group!(benches, bench_aggregate_daily);
criterion_main!(benches);
