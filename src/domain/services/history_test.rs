use std::sync::Arc;

use anyhow::Result;
use test_utils::add_function_fixture;
use test_utils::add_function_prompt;

use super::HistoryStore;
use super::HISTORY_STORAGE_KEY;
use super::MAX_HISTORY_ITEMS;
use crate::domain::models::CodePilotError;
use crate::domain::models::HistoryItem;
use crate::domain::models::KeyValueStore;
use crate::domain::models::Language;
use crate::domain::models::StoreBox;
use crate::infrastructure::storage::FileStore;
use crate::infrastructure::storage::MemoryStore;

fn memory_store() -> StoreBox {
    return Arc::new(MemoryStore::default());
}

#[tokio::test]
async fn it_starts_empty_without_stored_history() {
    let history = HistoryStore::load(memory_store()).await;
    assert!(history.is_empty());
    assert_eq!(history.latest(), None);
}

#[tokio::test]
async fn it_starts_empty_with_corrupt_history() -> Result<()> {
    let store = memory_store();
    store.set(HISTORY_STORAGE_KEY, "{not json").await?;

    let history = HistoryStore::load(store).await;
    assert!(history.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_prepends_and_persists() -> Result<()> {
    let store = memory_store();
    let mut history = HistoryStore::load(store.clone()).await;

    let first = history.append("first", Language::Python, "print(1)").await?;
    let second = history
        .append(add_function_prompt(), Language::Javascript, add_function_fixture())
        .await?;

    assert_eq!(history.len(), 2);
    assert_eq!(history.items()[0], second);
    assert_eq!(history.items()[1], first);

    let stored: Vec<HistoryItem> =
        serde_json::from_str(&store.get(HISTORY_STORAGE_KEY).await?.unwrap())?;
    assert_eq!(stored, history.items().to_vec());

    return Ok(());
}

#[tokio::test]
async fn it_creates_distinct_increasing_ids_in_rapid_succession() -> Result<()> {
    let mut history = HistoryStore::load(memory_store()).await;
    for idx in 0..10 {
        history
            .append(&format!("prompt {idx}"), Language::Go, "package main")
            .await?;
    }

    let ids = history
        .items()
        .iter()
        .map(|item| return item.id.parse::<i64>().unwrap())
        .collect::<Vec<i64>>();
    for pair in ids.windows(2) {
        assert!(pair[0] > pair[1]);
    }

    return Ok(());
}

#[tokio::test]
async fn it_never_exceeds_twenty_items() -> Result<()> {
    let mut history = HistoryStore::load(memory_store()).await;
    for idx in 0..MAX_HISTORY_ITEMS {
        history
            .append(&format!("prompt {idx}"), Language::Rust, "fn main() {}")
            .await?;
    }
    assert_eq!(history.len(), 20);
    let oldest = history.items()[19].clone();
    let second_oldest = history.items()[18].clone();
    assert_eq!(oldest.prompt, "prompt 0");

    history.append("prompt 20", Language::Rust, "fn main() {}").await?;

    assert_eq!(history.len(), 20);
    assert_eq!(history.items()[0].prompt, "prompt 20");
    assert_eq!(history.items()[19], second_oldest);
    assert!(matches!(
        history.get(&oldest.id),
        Err(CodePilotError::HistoryItemNotFound(_))
    ));

    return Ok(());
}

#[tokio::test]
async fn it_loads_an_item_by_id() -> Result<()> {
    let mut history = HistoryStore::load(memory_store()).await;
    let item = history
        .append(add_function_prompt(), Language::Javascript, add_function_fixture())
        .await?;

    let found = history.get(&item.id)?;
    assert_eq!(found.prompt, add_function_prompt());
    assert_eq!(found.language, Language::Javascript);
    assert_eq!(found.code, add_function_fixture());

    return Ok(());
}

#[tokio::test]
async fn it_reports_stale_ids_after_clear() -> Result<()> {
    let store = memory_store();
    let mut history = HistoryStore::load(store.clone()).await;
    let item = history.append("prompt", Language::Css, "body{}").await?;

    history.clear().await?;

    assert!(history.is_empty());
    assert_eq!(
        history.get(&item.id),
        Err(CodePilotError::HistoryItemNotFound(item.id.to_string()))
    );
    assert_eq!(store.get(HISTORY_STORAGE_KEY).await?, Some("[]".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_round_trips_through_the_file_store() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store: StoreBox = Arc::new(FileStore::new(dir.path().to_path_buf()));

    let mut history = HistoryStore::load(store.clone()).await;
    history.append("one", Language::Html, "<p>1</p>").await?;
    history.append("two", Language::Sql, "select 2;").await?;
    history.append("three", Language::Csharp, "var x = 3;").await?;

    let reloaded = HistoryStore::load(store).await;
    assert_eq!(reloaded.items(), history.items());

    return Ok(());
}

#[tokio::test]
async fn it_keeps_ids_increasing_across_reloads() -> Result<()> {
    let store = memory_store();
    let mut history = HistoryStore::load(store.clone()).await;
    let first = history.append("one", Language::Html, "<p>1</p>").await?;

    let mut reloaded = HistoryStore::load(store).await;
    let second = reloaded.append("two", Language::Html, "<p>2</p>").await?;

    assert!(second.id.parse::<i64>()? > first.id.parse::<i64>()?);
    return Ok(());
}

#[tokio::test]
async fn it_keeps_memory_and_storage_in_step_when_writes_fail() -> Result<()> {
    let stored = vec![HistoryItem {
        id: "1".to_string(),
        prompt: "first".to_string(),
        language: Language::Python,
        code: "print(1)".to_string(),
        timestamp: chrono::Utc::now(),
    }];
    let payload = serde_json::to_string(&stored)?;
    let store: StoreBox = Arc::new(MemoryStore::read_only(&[(HISTORY_STORAGE_KEY, &payload)]));

    let mut history = HistoryStore::load(store.clone()).await;
    assert_eq!(history.items(), stored.as_slice());

    assert!(history.append("second", Language::Go, "package main").await.is_err());
    assert_eq!(history.items(), stored.as_slice());

    assert!(history.clear().await.is_err());
    assert_eq!(history.items(), stored.as_slice());
    assert_eq!(store.get(HISTORY_STORAGE_KEY).await?, Some(payload));

    return Ok(());
}

#[test]
fn it_summarizes_long_prompts() {
    let item = HistoryItem {
        id: "1".to_string(),
        prompt: "a React component for a login form with Tailwind CSS styling".to_string(),
        language: Language::Typescript,
        code: "".to_string(),
        timestamp: chrono::Utc::now(),
    };

    insta::assert_snapshot!(item.summary(), @"a React component for a login form with ...");
}
