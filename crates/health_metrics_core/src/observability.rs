//! Counter names emitted by the core. Recording is a no-op until the host
//! installs a `metrics` recorder.

pub const RECORDS_NORMALIZED: &str = "health_metrics_records_normalized_total";
pub const RECORDS_DROPPED: &str = "health_metrics_records_dropped_total";
pub const ACHIEVEMENTS_RECORDED: &str = "health_metrics_achievements_recorded_total";
pub const NOTIFICATIONS_SCHEDULED: &str = "health_metrics_notifications_scheduled_total";
pub const PERSISTENCE_FAILURES: &str = "health_metrics_persistence_failures_total";

/// Register descriptions with whatever recorder is installed.
pub fn describe_metrics() {
    metrics::describe_counter!(RECORDS_NORMALIZED, "Raw records turned into metric records");
    metrics::describe_counter!(RECORDS_DROPPED, "Raw records skipped as malformed");
    metrics::describe_counter!(
        ACHIEVEMENTS_RECORDED,
        "Daily achievement history entries written"
    );
    metrics::describe_counter!(
        NOTIFICATIONS_SCHEDULED,
        "Achievement notifications handed to the dispatcher"
    );
    metrics::describe_counter!(
        PERSISTENCE_FAILURES,
        "Key-value store reads or writes that failed"
    );
}
