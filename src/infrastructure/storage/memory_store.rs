use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::models::KeyValueStore;

/// Slots kept in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    slots: DashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    /// A store whose writes always fail, keeping whatever `slots` held.
    pub fn read_only(slots: &[(&str, &str)]) -> MemoryStore {
        return MemoryStore {
            slots: slots
                .iter()
                .map(|(key, value)| {
                    return (key.to_string(), value.to_string());
                })
                .collect(),
            read_only: true,
        };
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        return Ok(self.slots.get(key).map(|val| return val.to_string()));
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.read_only {
            bail!(format!("Storage is read only, cannot write {key}"));
        }
        self.slots.insert(key.to_string(), value.to_string());
        return Ok(());
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.read_only {
            bail!(format!("Storage is read only, cannot remove {key}"));
        }
        self.slots.remove(key);
        return Ok(());
    }
}
