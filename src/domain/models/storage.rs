use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// A process-external key-value slot store that survives across sessions.
#[async_trait]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

pub type StoreBox = Arc<dyn KeyValueStore + Send + Sync>;
