#[cfg(test)]
#[path = "handoff_test.rs"]
mod tests;

use anyhow::Result;

use crate::domain::models::CodePilotError;
use crate::domain::models::PreviewPayload;
use crate::domain::models::StoreBox;

pub const PREVIEW_STORAGE_KEY: &str = "codepilot_preview";

/// Single slot handing the latest result from a session to the preview
/// surface. Each read consumes the slot.
pub struct PreviewHandoff {
    store: StoreBox,
}

impl PreviewHandoff {
    pub fn new(store: StoreBox) -> PreviewHandoff {
        return PreviewHandoff { store };
    }

    pub async fn write(&self, payload: &PreviewPayload) -> Result<()> {
        let serialized = serde_json::to_string(payload)?;
        self.store.set(PREVIEW_STORAGE_KEY, &serialized).await?;

        tracing::debug!(language = %payload.language, "Wrote preview hand-off");
        return Ok(());
    }

    /// Reads and removes the slot. `Ok(None)` means nothing was handed off.
    pub async fn take(&self) -> Result<Option<PreviewPayload>, CodePilotError> {
        let stored = self
            .store
            .get(PREVIEW_STORAGE_KEY)
            .await
            .map_err(|err| return CodePilotError::corrupt("preview", err))?;

        let Some(serialized) = stored else {
            return Ok(None);
        };

        if let Err(err) = self.store.remove(PREVIEW_STORAGE_KEY).await {
            tracing::warn!(error = ?err, "Failed to remove preview hand-off");
        }

        let payload = serde_json::from_str::<PreviewPayload>(&serialized)
            .map_err(|err| return CodePilotError::corrupt("preview", err))?;

        return Ok(Some(payload));
    }
}
