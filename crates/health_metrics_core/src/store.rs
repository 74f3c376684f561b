//! Typed access to the host's key-value persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::achievement::AchievementHistoryEntry;
use crate::nutrition::{NutritionSummary, NutritionTarget};
use crate::{KeyValueStore, MetricsError};

pub mod keys {
    use chrono::NaiveDate;

    use crate::utils::date_key;

    pub fn nutrition_target(user_id: &str) -> String {
        format!("nutrition_target:{user_id}")
    }

    pub fn achievement_history(user_id: &str) -> String {
        format!("achievement_history:{user_id}")
    }

    pub fn daily_snapshot(user_id: &str, date: NaiveDate) -> String {
        format!("daily_snapshot:{user_id}:{}", date_key(date))
    }
}

/// Process-local store for hosts without durable storage, and for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, MetricsError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), MetricsError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

async fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, MetricsError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

async fn save_json<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), MetricsError> {
    store.set(key, serde_json::to_string(value)?).await
}

pub async fn load_target(
    store: &dyn KeyValueStore,
    user_id: &str,
) -> Result<Option<NutritionTarget>, MetricsError> {
    load_json(store, &keys::nutrition_target(user_id)).await
}

pub async fn save_target(
    store: &dyn KeyValueStore,
    user_id: &str,
    target: &NutritionTarget,
) -> Result<(), MetricsError> {
    save_json(store, &keys::nutrition_target(user_id), target).await
}

/// Full history, oldest entry first.
pub async fn load_history(
    store: &dyn KeyValueStore,
    user_id: &str,
) -> Result<Vec<AchievementHistoryEntry>, MetricsError> {
    Ok(load_json(store, &keys::achievement_history(user_id))
        .await?
        .unwrap_or_default())
}

pub async fn find_history_entry(
    store: &dyn KeyValueStore,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<AchievementHistoryEntry>, MetricsError> {
    Ok(load_history(store, user_id)
        .await?
        .into_iter()
        .find(|e| e.date == date))
}

/// Append one entry. The caller is responsible for checking that the date is
/// not already present.
pub async fn append_history(
    store: &dyn KeyValueStore,
    user_id: &str,
    entry: AchievementHistoryEntry,
) -> Result<(), MetricsError> {
    let mut history = load_history(store, user_id).await?;
    history.push(entry);
    save_json(store, &keys::achievement_history(user_id), &history).await
}

pub async fn save_snapshot(
    store: &dyn KeyValueStore,
    user_id: &str,
    date: NaiveDate,
    summary: &NutritionSummary,
) -> Result<(), MetricsError> {
    save_json(store, &keys::daily_snapshot(user_id, date), summary).await
}

pub async fn load_snapshot(
    store: &dyn KeyValueStore,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<NutritionSummary>, MetricsError> {
    load_json(store, &keys::daily_snapshot(user_id, date)).await
}
