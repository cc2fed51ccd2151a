use std::sync::Arc;

use anyhow::Result;
use test_utils::html_fixture;

use super::render;
use super::PREVIEW_FILE_NAME;
use crate::domain::models::Language;
use crate::domain::models::PreviewPayload;
use crate::domain::services::PreviewHandoff;
use crate::infrastructure::storage::MemoryStore;

#[tokio::test]
async fn it_writes_the_host_page_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let handoff = PreviewHandoff::new(Arc::new(MemoryStore::default()));
    handoff
        .write(&PreviewPayload {
            code: html_fixture().to_string(),
            language: Language::Html,
        })
        .await?;

    let (page, file_path) = render(&handoff, dir.path()).await?;
    assert!(page.is_ready());
    assert_eq!(file_path, dir.path().join(PREVIEW_FILE_NAME));

    let written = tokio::fs::read_to_string(&file_path).await?;
    assert_eq!(written, page.to_html());
    assert!(written.contains("sandbox=\"allow-scripts\""));

    let (second, _) = render(&handoff, dir.path()).await?;
    assert!(!second.is_ready());
    let written = tokio::fs::read_to_string(&file_path).await?;
    assert!(written.contains("No preview data found"));

    return Ok(());
}
