#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

use std::io::Write;
use std::path;
use std::sync::Arc;

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use yansi::Paint;

use super::cli::format_history_item;
use super::preview;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Language;
use crate::domain::models::SessionView;
use crate::domain::models::Settlement;
use crate::domain::models::SlashCommand;
use crate::domain::models::SourceBox;
use crate::domain::models::StoreBox;
use crate::domain::models::ToastKind;
use crate::domain::models::ViewUpdate;
use crate::domain::services::clipboard::ClipboardService;
use crate::domain::services::HistoryStore;
use crate::domain::services::PreviewHandoff;
use crate::domain::services::SessionController;
use crate::infrastructure::storage::FileStore;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /language (/l) [LANGUAGE] - Sets the language code is generated in. Run /languages for the list.
- /languages (/ls) - Lists every language code can be generated in.
- /history (/h) - Lists saved generations, most recent first.
- /load (/o) [ID] - Loads a saved generation by its ID from /history.
- /clear - Removes every saved generation.
- /preview (/p) - Renders the code on display as a sandboxed HTML page. Works for HTML, CSS and JavaScript.
- /copy (/c) - Copies the code on display to your clipboard.
- /save (/s) [FILE?] - Saves the code on display to FILE, or to codepilot_snippet_LANGUAGE.EXT.
- /improve (/i) [FEEDBACK] - Suggests how the prompt could be improved, given your feedback on the result.
- /abort (/a) - Cancels the generation in progress.
- /quit /exit (/q) - Exit CodePilot.
- /help (/?) - Provides this help menu.

Anything else is sent as a prompt. Submitting while code is still streaming replaces that generation. CTRL+C cancels a generation in progress, otherwise exits.
        "#;

    return text.trim().to_string();
}

pub fn snippet_file_name(language: Language) -> String {
    return format!("codepilot_snippet_{language}.{}", language.extension());
}

pub fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return "The model had no suggestions for this prompt.".to_string();
    }

    return suggestions
        .iter()
        .enumerate()
        .map(|(idx, suggestion)| {
            return format!("{}. {suggestion}", idx + 1);
        })
        .collect::<Vec<String>>()
        .join("\n");
}

/// Prints code to stdout as it arrives and everything else to stderr, so the
/// code can be piped on its own.
#[derive(Default)]
pub struct TerminalView {
    printed: bool,
}

impl SessionView for TerminalView {
    fn update(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Busy(request) => {
                self.printed = false;
                eprintln!(
                    "{}",
                    Paint::new(format!("Generating {} code...", request.language.label())).dimmed()
                );
            }
            ViewUpdate::Fragment(text) => {
                self.printed = true;
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            ViewUpdate::Cleared() => {
                if self.printed {
                    println!();
                    eprintln!("{}", Paint::new("(partial output discarded)").dimmed());
                }
                self.printed = false;
            }
            ViewUpdate::Settled(settlement) => {
                if self.printed && matches!(settlement, Settlement::Success(_)) {
                    println!();
                }
                self.printed = false;
            }
            ViewUpdate::Loaded(code) => {
                println!("{code}");
            }
            ViewUpdate::Notice(toast) => {
                let title = match toast.kind {
                    ToastKind::Normal => Paint::green(toast.title).bold(),
                    ToastKind::Error => Paint::red(toast.title).bold(),
                };
                eprintln!("{title}: {}", toast.description);
            }
        }
    }
}

fn print_error(message: &str) {
    eprintln!("{}", Paint::red(message));
}

fn print_languages(current: Language) {
    let lines = Language::all()
        .iter()
        .map(|language| {
            let marker = if *language == current { "*" } else { "-" };
            return format!("{marker} {language} ({})", language.label());
        })
        .collect::<Vec<String>>();

    println!("{}", lines.join("\n"));
}

fn print_history(history: &HistoryStore) {
    if history.is_empty() {
        println!("No history yet. Generated code will appear here.");
        return;
    }

    let lines = history
        .items()
        .iter()
        .map(|item| {
            return format_history_item(item);
        })
        .collect::<Vec<String>>();
    println!("{}", lines.join("\n"));
}

async fn save_code(code: &str, language: Language, target: &str) -> Result<path::PathBuf> {
    let file_path = if target.is_empty() {
        path::PathBuf::from(snippet_file_name(language))
    } else {
        path::PathBuf::from(target)
    };
    fs::write(&file_path, code).await?;

    return Ok(file_path);
}

/// Handles one line of input. Returns false once the session should end.
pub async fn handle_input<V: SessionView>(
    controller: &mut SessionController<V>,
    store: &StoreBox,
    text: &str,
) -> Result<bool> {
    if text.trim().is_empty() {
        return Ok(true);
    }

    let Some(command) = SlashCommand::parse(text) else {
        let language = controller.language.to_string();
        // Rejections are reported through the view.
        let _ = controller.submit(text, &language);
        return Ok(true);
    };

    if command.is_quit() {
        return Ok(false);
    }

    if command.is_help() {
        println!("{}", help_text());
    } else if command.is_language_list() {
        print_languages(controller.language);
    } else if command.is_language_set() {
        match Language::parse(&command.text()) {
            Some(language) => {
                controller.language = language;
                println!("Generating {} from now on.", language.label());
            }
            None => print_error(&format!(
                "'{}' is not a supported language. Run /languages for the list.",
                command.text()
            )),
        }
    } else if command.is_history() {
        print_history(controller.history());
    } else if command.is_load() {
        if command.text().is_empty() {
            print_error("You must specify an ID with /load. Run /history for the list.");
        } else {
            // Not found is reported through the view.
            let _ = controller.load_history_item(&command.text());
        }
    } else if command.is_clear_history() {
        controller.clear_history().await?;
    } else if command.is_preview() {
        if controller.open_preview().await.is_ok() {
            let out_dir = path::PathBuf::from(Config::get(ConfigKey::DataDir));
            let (page, file_path) =
                preview::render(&PreviewHandoff::new(store.clone()), &out_dir).await?;
            preview::print_result(&page, &file_path);
        }
    } else if command.is_copy() {
        if controller.code().trim().is_empty() {
            print_error("There is no code to copy.");
        } else if let Err(err) = ClipboardService::set(controller.code()) {
            print_error(&format!("Failed to copy code: {err}"));
        } else {
            println!("Copied code to clipboard.");
        }
    } else if command.is_save() {
        if controller.code().trim().is_empty() {
            print_error("There is no code to save.");
        } else {
            let file_path =
                save_code(controller.code(), controller.language, &command.text()).await?;
            println!("Saved code to {}", file_path.to_string_lossy());
        }
    } else if command.is_improve() {
        if let Ok(suggestions) = controller.suggest_improvements(&command.text()).await {
            println!("{}", format_suggestions(&suggestions));
        }
    } else if command.is_abort() && !controller.abort() {
        println!("Nothing to cancel.");
    }

    return Ok(true);
}

/// One-shot generation for the `generate` command. Returns whether code was
/// generated.
pub async fn generate_once(
    source: SourceBox,
    prompt: &str,
    sync: bool,
    preview: bool,
    output: Option<String>,
) -> Result<bool> {
    let store: StoreBox = Arc::new(FileStore::default());
    let history = HistoryStore::load(store.clone()).await;
    let handoff = PreviewHandoff::new(store.clone());
    let (mut controller, mut events_rx) =
        SessionController::new(source, history, handoff, TerminalView::default());

    let language = Config::get(ConfigKey::Language);
    controller.language = Language::parse(&language).unwrap_or_default();

    let settlement = if sync {
        controller.generate_complete(prompt, &language).await.ok()
    } else if controller.submit(prompt, &language).is_ok() {
        controller.run_until_settled(&mut events_rx).await
    } else {
        None
    };

    tracing::debug!(
        state = ?controller.state(),
        prompt = controller.prompt(),
        "Generation settled"
    );
    let Some(Settlement::Success(result)) = settlement else {
        return Ok(false);
    };

    if let Some(target) = output {
        let file_path = save_code(&result.code, controller.language, &target).await?;
        eprintln!("Saved code to {}", file_path.to_string_lossy());
    }

    if preview && controller.open_preview().await.is_ok() {
        let out_dir = path::PathBuf::from(Config::get(ConfigKey::DataDir));
        let (page, file_path) =
            preview::render(&PreviewHandoff::new(store.clone()), &out_dir).await?;
        preview::print_result(&page, &file_path);
    }

    return Ok(true);
}

/// Interactive session reading prompts and commands from stdin.
pub async fn start(source: SourceBox, load: Option<String>) -> Result<()> {
    let store: StoreBox = Arc::new(FileStore::default());
    let history = HistoryStore::load(store.clone()).await;
    let handoff = PreviewHandoff::new(store.clone());
    let (mut controller, mut events_rx) =
        SessionController::new(source, history, handoff, TerminalView::default());
    controller.language = Language::parse(&Config::get(ConfigKey::Language)).unwrap_or_default();

    if let Some(id) = load {
        let _ = controller.load_history_item(&id);
    }

    eprintln!(
        "{} Generating {} code. Type a prompt, or /help for commands.",
        Paint::new("CodePilot").bold(),
        controller.language.label()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(text) => {
                        if !handle_input(&mut controller, &store, &text).await? {
                            break;
                        }
                    }
                    None => {
                        controller.run_until_settled(&mut events_rx).await;
                        break;
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                controller.handle_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                if !controller.abort() {
                    break;
                }
            }
        }
    }

    return Ok(());
}
