use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use health_metrics_core::store::{self, keys};
use health_metrics_core::{
    AchievementOutcome, AchievementState, AchievementTracker, Config, InMemoryStore,
    KeyValueStore, MacroActuals, MetricsError, NotificationDispatcher, NutritionTarget,
};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn schedule(&self, title: &str, body: &str) -> Result<(), MetricsError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl NotificationDispatcher for FailingNotifier {
    async fn schedule(&self, _title: &str, _body: &str) -> Result<(), MetricsError> {
        Err(MetricsError::Notification("permission denied".into()))
    }
}

/// Reads succeed (empty), writes fail.
struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, MetricsError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), MetricsError> {
        Err(MetricsError::PersistenceUnavailable("read-only".into()))
    }
}

struct UnreachableStore;

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, MetricsError> {
        Err(MetricsError::PersistenceUnavailable("offline".into()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), MetricsError> {
        Err(MetricsError::PersistenceUnavailable("offline".into()))
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn target() -> NutritionTarget {
    NutritionTarget {
        calories: Some(2000.0),
        carbs: Some(200.0),
        protein: Some(120.0),
        fats: Some(60.0),
    }
}

fn met() -> MacroActuals {
    MacroActuals {
        carbs: 210.0,
        protein: 125.0,
        fats: 62.0,
    }
}

#[tokio::test]
async fn first_completion_records_and_notifies_once() {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = AchievementTracker::new(store.clone(), notifier.clone());
    let d = day(2025, 1, 10);

    assert_eq!(tracker.state("u1", d).await, AchievementState::NoEntry);

    let first = tracker
        .record_achievement("u1", d, met(), 2300.0, 200.0, Some(&target()))
        .await;
    assert_eq!(
        first,
        AchievementOutcome {
            completed: true,
            is_new_entry: true
        }
    );
    assert_eq!(notifier.count(), 1);

    let again = tracker
        .record_achievement("u1", d, met(), 2500.0, 0.0, Some(&target()))
        .await;
    assert_eq!(
        again,
        AchievementOutcome {
            completed: true,
            is_new_entry: false
        }
    );
    assert_eq!(notifier.count(), 1);

    let history = store::load_history(store.as_ref(), "u1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].metrics.net_calories, 2100.0);
    assert_eq!(history[0].target_calories, 2000.0);
    assert_eq!(
        tracker.state("u1", d).await,
        AchievementState::Recorded { completed: true }
    );
}

#[tokio::test]
async fn incomplete_day_is_recorded_and_never_flips() {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = AchievementTracker::new(store.clone(), notifier.clone());
    let d = day(2025, 1, 11);
    let short = MacroActuals {
        protein: 90.0,
        ..met()
    };

    let first = tracker
        .record_achievement("u1", d, short, 2300.0, 0.0, Some(&target()))
        .await;
    assert!(!first.completed);
    assert!(first.is_new_entry);

    // Totals later cross the goal, but the day is already decided.
    let later = tracker
        .record_achievement("u1", d, met(), 2300.0, 0.0, Some(&target()))
        .await;
    assert!(!later.completed);
    assert!(!later.is_new_entry);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn missing_target_records_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = AchievementTracker::new(store.clone(), Arc::new(RecordingNotifier::default()));
    let out = tracker
        .record_achievement("u1", day(2025, 1, 12), met(), 3000.0, 0.0, None)
        .await;
    assert_eq!(out, AchievementOutcome::default());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn target_without_calories_uses_configured_default() {
    let mut config = Config::for_user("u1");
    config.default_target_calories = 1800.0;
    config.notification_title = "Well done".into();
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = AchievementTracker::from_config(
        Arc::new(InMemoryStore::new()),
        notifier.clone(),
        &config,
    );
    let t = NutritionTarget {
        protein: Some(100.0),
        ..Default::default()
    };

    let out = tracker
        .record_achievement("u1", day(2025, 1, 13), met(), 1900.0, 50.0, Some(&t))
        .await;
    assert!(out.completed);
    assert_eq!(notifier.sent.lock().unwrap()[0].0, "Well done");
}

#[tokio::test]
async fn days_and_users_are_independent() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = AchievementTracker::new(store.clone(), Arc::new(RecordingNotifier::default()));
    for (user, d) in [("u1", day(2025, 1, 1)), ("u1", day(2025, 1, 2)), ("u2", day(2025, 1, 1))] {
        let out = tracker
            .record_achievement(user, d, met(), 2100.0, 0.0, Some(&target()))
            .await;
        assert!(out.is_new_entry, "{user} {d}");
    }
    assert_eq!(store::load_history(store.as_ref(), "u1").await.unwrap().len(), 2);
    assert_eq!(store::load_history(store.as_ref(), "u2").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_recomputations_write_once() {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = Arc::new(AchievementTracker::new(store.clone(), notifier.clone()));
    let d = day(2025, 1, 14);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker
                    .record_achievement("u1", d, met(), 2100.0, 0.0, Some(&target()))
                    .await
            })
        })
        .collect();

    let mut new_entries = 0;
    for h in handles {
        let out = h.await.unwrap();
        assert!(out.completed);
        if out.is_new_entry {
            new_entries += 1;
        }
    }
    assert_eq!(new_entries, 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(store::load_history(store.as_ref(), "u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn write_failure_degrades_without_notification() {
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = AchievementTracker::new(Arc::new(ReadOnlyStore), notifier.clone());
    let out = tracker
        .record_achievement("u1", day(2025, 1, 15), met(), 2100.0, 0.0, Some(&target()))
        .await;
    assert_eq!(
        out,
        AchievementOutcome {
            completed: true,
            is_new_entry: false
        }
    );
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn unreachable_store_reads_as_no_entry() {
    let tracker = AchievementTracker::new(
        Arc::new(UnreachableStore),
        Arc::new(RecordingNotifier::default()),
    );
    let d = day(2025, 1, 16);
    assert_eq!(tracker.state("u1", d).await, AchievementState::NoEntry);
    let out = tracker
        .record_achievement("u1", d, met(), 1000.0, 0.0, Some(&target()))
        .await;
    assert!(!out.completed);
    assert!(!out.is_new_entry);
}

#[tokio::test]
async fn notification_failure_keeps_the_entry() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = AchievementTracker::new(store.clone(), Arc::new(FailingNotifier));
    let out = tracker
        .record_achievement("u1", day(2025, 1, 17), met(), 2100.0, 0.0, Some(&target()))
        .await;
    assert!(out.is_new_entry);
    assert!(
        store
            .get(&keys::achievement_history("u1"))
            .await
            .unwrap()
            .is_some()
    );
}
