use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use test_utils::add_function_fragments;

use super::format_suggestions;
use super::handle_input;
use super::help_text;
use super::snippet_file_name;
use crate::domain::models::Language;
use crate::domain::models::StoreBox;
use crate::domain::services::Gateway;
use crate::domain::services::HistoryStore;
use crate::domain::services::PreviewHandoff;
use crate::domain::services::SessionController;
use crate::domain::testing::RecordingView;
use crate::domain::testing::ScriptedBackend;
use crate::infrastructure::storage::MemoryStore;

#[test]
fn it_names_snippet_files_after_the_language() {
    assert_eq!(snippet_file_name(Language::Javascript), "codepilot_snippet_javascript.js");
    assert_eq!(snippet_file_name(Language::Python), "codepilot_snippet_python.py");
    assert_eq!(snippet_file_name(Language::Csharp), "codepilot_snippet_csharp.csharp");
}

#[test]
fn it_numbers_suggestions() {
    let suggestions = vec![
        "Name the parameters.".to_string(),
        "Mention the return type.".to_string(),
    ];
    insta::assert_snapshot!(format_suggestions(&suggestions), @r###"
    1. Name the parameters.
    2. Mention the return type.
    "###);
    assert_eq!(
        format_suggestions(&[]),
        "The model had no suggestions for this prompt."
    );
}

#[test]
fn it_lists_every_command_in_help() {
    let help = help_text();
    for command in [
        "/language", "/languages", "/history", "/load", "/clear", "/preview", "/copy", "/save",
        "/improve", "/abort", "/quit", "/help",
    ] {
        assert!(help.contains(command), "missing {command}");
    }
}

#[tokio::test]
async fn it_routes_input_between_commands_and_prompts() -> Result<()> {
    let store: StoreBox = Arc::new(MemoryStore::default());
    let backend = ScriptedBackend::streaming(add_function_fragments());
    let gateway = Gateway::new(Box::new(backend.clone()), Duration::from_secs(2));
    let (mut controller, mut events_rx) = SessionController::new(
        Arc::new(gateway),
        HistoryStore::load(store.clone()).await,
        PreviewHandoff::new(store.clone()),
        RecordingView::default(),
    );

    assert!(handle_input(&mut controller, &store, "/lang python").await?);
    assert_eq!(controller.language, Language::Python);
    assert!(handle_input(&mut controller, &store, "/lang cobol").await?);
    assert_eq!(controller.language, Language::Python);
    assert!(handle_input(&mut controller, &store, "   ").await?);
    assert!(backend.recorded_prompts().is_empty());

    assert!(handle_input(&mut controller, &store, "add two numbers").await?);
    controller.run_until_settled(&mut events_rx).await;
    assert_eq!(controller.history().len(), 1);
    assert_eq!(controller.history().latest().unwrap().language, Language::Python);

    assert!(!handle_input(&mut controller, &store, "/quit").await?);

    return Ok(());
}
