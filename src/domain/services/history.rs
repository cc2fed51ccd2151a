#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::models::CodePilotError;
use crate::domain::models::HistoryItem;
use crate::domain::models::Language;
use crate::domain::models::StoreBox;

pub const HISTORY_STORAGE_KEY: &str = "codepilot_history";
pub const MAX_HISTORY_ITEMS: usize = 20;

/// Most-recent-first record of completed generations, persisted after every
/// mutation.
pub struct HistoryStore {
    store: StoreBox,
    items: Vec<HistoryItem>,
    last_id: i64,
}

impl HistoryStore {
    /// Reads the persisted sequence once. A missing or malformed value starts
    /// an empty history instead of failing.
    pub async fn load(store: StoreBox) -> HistoryStore {
        let items = match store.get(HISTORY_STORAGE_KEY).await {
            Ok(Some(payload)) => match serde_json::from_str::<Vec<HistoryItem>>(&payload) {
                Ok(items) => items,
                Err(err) => {
                    let err = CodePilotError::corrupt("history", err);
                    tracing::warn!(error = ?err, "Ignoring stored history");
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to read stored history");
                vec![]
            }
        };

        let last_id = items
            .iter()
            .filter_map(|item| return item.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        return HistoryStore {
            store,
            items,
            last_id,
        };
    }

    pub fn items(&self) -> &[HistoryItem] {
        return &self.items;
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn latest(&self) -> Option<&HistoryItem> {
        return self.items.first();
    }

    /// Looks an item up by id. Ids go stale after a clear or once the item has
    /// been evicted.
    pub fn get(&self, id: &str) -> Result<&HistoryItem, CodePilotError> {
        return self
            .items
            .iter()
            .find(|item| return item.id == id.trim())
            .ok_or_else(|| return CodePilotError::HistoryItemNotFound(id.to_string()));
    }

    pub async fn append(
        &mut self,
        prompt: &str,
        language: Language,
        code: &str,
    ) -> Result<HistoryItem> {
        let now = Utc::now();
        let item = HistoryItem {
            id: self.next_id(now),
            prompt: prompt.to_string(),
            language,
            code: code.to_string(),
            timestamp: now,
        };

        let mut items = Vec::with_capacity(MAX_HISTORY_ITEMS);
        items.push(item.clone());
        items.extend(self.items.iter().take(MAX_HISTORY_ITEMS - 1).cloned());
        self.persist(&items).await?;
        self.items = items;

        tracing::debug!(id = item.id, size = self.items.len(), "Appended history item");
        return Ok(item);
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.persist(&[]).await?;
        self.items.clear();

        return Ok(());
    }

    /// Ids are creation times in milliseconds, bumped past the previous id so
    /// rapid successive creations never collide.
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let mut id = now.timestamp_millis();
        if id <= self.last_id {
            id = self.last_id + 1;
        }
        self.last_id = id;

        return id.to_string();
    }

    async fn persist(&self, items: &[HistoryItem]) -> Result<()> {
        let payload = serde_json::to_string(items)?;
        self.store.set(HISTORY_STORAGE_KEY, &payload).await?;

        return Ok(());
    }
}
