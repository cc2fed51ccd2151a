#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Language;

/// A persisted record of one completed, non-empty generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub prompt: String,
    pub language: Language,
    pub code: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryItem {
    /// Prompt shortened for one line listings.
    pub fn summary(&self) -> String {
        let first_line = self.prompt.lines().next().unwrap_or("");
        if first_line.chars().count() > 40 {
            let head = first_line.chars().take(40).collect::<String>();
            return format!("{head}...");
        }

        return first_line.to_string();
    }

    /// How long ago the item was created, in the coarsest unit that fits.
    pub fn age(&self, now: DateTime<Utc>) -> String {
        let elapsed = now - self.timestamp;
        if elapsed < Duration::minutes(1) {
            return "just now".to_string();
        }

        let (count, unit) = if elapsed < Duration::hours(1) {
            (elapsed.num_minutes(), "minute")
        } else if elapsed < Duration::days(1) {
            (elapsed.num_hours(), "hour")
        } else if elapsed < Duration::days(30) {
            (elapsed.num_days(), "day")
        } else if elapsed < Duration::days(365) {
            (elapsed.num_days() / 30, "month")
        } else {
            (elapsed.num_days() / 365, "year")
        };

        if count == 1 {
            return format!("1 {unit} ago");
        }
        return format!("{count} {unit}s ago");
    }
}
