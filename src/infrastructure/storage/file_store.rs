#[cfg(test)]
#[path = "file_store_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::KeyValueStore;

/// One JSON file per slot under a data directory.
pub struct FileStore {
    pub data_dir: path::PathBuf,
}

impl Default for FileStore {
    fn default() -> FileStore {
        return FileStore::new(path::PathBuf::from(Config::get(ConfigKey::DataDir)));
    }
}

impl FileStore {
    pub fn new(data_dir: path::PathBuf) -> FileStore {
        return FileStore { data_dir };
    }

    pub fn get_file_path(&self, key: &str) -> path::PathBuf {
        return self.data_dir.join(format!("{key}.json"));
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let file_path = self.get_file_path(key);
        if !file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(file_path).await?;
        return Ok(Some(payload));
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).await?;
        }

        // Readers never observe a partially written slot.
        let file_path = self.get_file_path(key);
        let tmp_path = self.data_dir.join(format!("{key}.json.tmp"));
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        fs::rename(tmp_path, file_path).await?;

        return Ok(());
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let file_path = self.get_file_path(key);
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path).await?;
        return Ok(());
    }
}
