#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;

use std::path;
use std::sync::Arc;

use anyhow::Result;
use tokio::fs;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::PreviewPayload;
use crate::domain::models::StoreBox;
use crate::domain::services::HistoryStore;
use crate::domain::services::PreviewHandoff;
use crate::domain::services::PreviewPage;
use crate::infrastructure::storage::FileStore;

pub const PREVIEW_FILE_NAME: &str = "preview.html";

/// Consumes the hand-off and writes the resulting page to `out_dir`. The page
/// is written even when there is nothing to preview, so a stale preview never
/// survives a failed one.
pub async fn render(
    handoff: &PreviewHandoff,
    out_dir: &path::Path,
) -> Result<(PreviewPage, path::PathBuf)> {
    let page = PreviewPage::from_handoff(handoff.take().await);

    if !out_dir.exists() {
        fs::create_dir_all(out_dir).await?;
    }
    let file_path = out_dir.join(PREVIEW_FILE_NAME);
    fs::write(&file_path, page.to_html()).await?;

    tracing::debug!(path = ?file_path, ready = page.is_ready(), "Rendered preview");
    return Ok((page, file_path));
}

pub fn print_result(page: &PreviewPage, file_path: &path::Path) {
    match page {
        PreviewPage::Ready { language, .. } => {
            eprintln!(
                "{} {} preview written to {}",
                Paint::green("Preview ready:").bold(),
                language.label(),
                file_path.to_string_lossy()
            );
        }
        PreviewPage::Unavailable { message, .. } => {
            eprintln!("{} {message}", Paint::red("Preview unavailable:").bold());
        }
    }
}

/// The `preview` command. With an id, the saved generation is handed off
/// first.
pub async fn start(id: Option<String>) -> Result<()> {
    let store: StoreBox = Arc::new(FileStore::default());
    let handoff = PreviewHandoff::new(store.clone());

    if let Some(id) = id {
        let history = HistoryStore::load(store).await;
        let item = history.get(&id)?;
        handoff
            .write(&PreviewPayload {
                code: item.code.to_string(),
                language: item.language,
            })
            .await?;
    }

    let out_dir = path::PathBuf::from(Config::get(ConfigKey::DataDir));
    let (page, file_path) = render(&handoff, &out_dir).await?;
    print_result(&page, &file_path);

    return Ok(());
}
