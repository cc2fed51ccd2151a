#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use chrono::Utc;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::ui::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::models::HistoryItem;
use crate::domain::models::Language;
use crate::domain::services::HistoryStore;
use crate::infrastructure::storage::FileStore;

/// What the binary should do once argument parsing is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Launch {
    Session {
        load: Option<String>,
    },
    Generate {
        prompt: String,
        sync: bool,
        preview: bool,
        output: Option<String>,
    },
    Preview {
        id: Option<String>,
    },
    Serve,
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn format_history_item(item: &HistoryItem) -> String {
    return format!(
        "- (ID: {}) {}, {}, {}",
        item.id,
        item.summary(),
        item.language.label(),
        item.age(Utc::now())
    );
}

async fn load_history() -> HistoryStore {
    return HistoryStore::load(Arc::new(FileStore::default())).await;
}

async fn print_history_list() -> Result<()> {
    let history = load_history().await;
    if history.is_empty() {
        println!("No history yet. Generated code will appear here.");
        return Ok(());
    }

    let lines = history
        .items()
        .iter()
        .map(|item| {
            return format_history_item(item);
        })
        .collect::<Vec<String>>();
    println!("{}", lines.join("\n"));

    return Ok(());
}

async fn print_history_item(id: &str) -> Result<()> {
    let history = load_history().await;
    let item = history.get(id)?;

    println!(
        "{}",
        Paint::new(format!("{} ({})", item.prompt, item.language.label())).bold()
    );
    println!("{}", item.code);

    return Ok(());
}

async fn select_history_item_interactive() -> Result<Option<String>> {
    let history = load_history().await;
    if history.is_empty() {
        println!("No history yet. Generated code will appear here.");
        return Ok(None);
    }

    let options = history
        .items()
        .iter()
        .map(|item| {
            return format_history_item(item);
        })
        .collect::<Vec<String>>();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which generation would you like to load?")
        .default(0)
        .items(&options)
        .interact_opt()?;

    if let Some(idx) = selection {
        return Ok(Some(history.items()[idx].id.to_string()));
    }

    return Ok(None);
}

fn print_languages() {
    let lines = Language::all()
        .iter()
        .map(|language| {
            return format!("- {language} ({})", language.label());
        })
        .collect::<Vec<String>>();

    println!("{}", lines.join("\n"));
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn arg_history_id(required: bool) -> Arg {
    return Arg::new("id")
        .short('i')
        .long("id")
        .help("History item ID, as shown by `history list`.")
        .num_args(1)
        .required(required);
}

fn subcommand_history() -> Command {
    return Command::new("history")
        .about("Manage previously generated code.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List saved generations, most recent first."))
        .subcommand(
            Command::new("show")
                .about("Print the prompt and code of a saved generation.")
                .arg(arg_history_id(true)),
        )
        .subcommand(
            Command::new("load")
                .about("Start a session with a saved generation loaded. Omit the ID to pick one interactively.")
                .arg(arg_history_id(false)),
        )
        .subcommand(Command::new("clear").about("Remove every saved generation."))
        .subcommand(Command::new("path").about("Print the directory history is stored in."));
}

fn subcommand_generate() -> Command {
    return Command::new("generate")
        .about("Generate code for a single prompt and print it as it streams in.")
        .arg(
            Arg::new("prompt")
                .help("What the code should do.")
                .num_args(1..)
                .required(true),
        )
        .arg(
            Arg::new("sync")
                .long("sync")
                .help("Wait for the complete response instead of streaming.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Render a preview of the result when the language supports it.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Also write the generated code to this file.")
                .num_args(1),
        );
}

fn subcommand_preview() -> Command {
    return Command::new("preview")
        .about("Render the latest preview hand-off, or a saved generation, to an HTML page.")
        .arg(arg_history_id(false));
}

fn subcommand_serve() -> Command {
    return Command::new("serve").about("Run the HTTP generation endpoint.");
}

fn arg_backend() -> Arg {
    return Arg::new(ConfigKey::Backend.to_string())
        .short('b')
        .long(ConfigKey::Backend.to_string())
        .env("CODEPILOT_BACKEND")
        .num_args(1)
        .help(format!(
            "The backend hosting the model used for generation. [default: {}]",
            Config::default(ConfigKey::Backend)
        ))
        .value_parser(PossibleValuesParser::new(BackendName::VARIANTS))
        .global(true);
}

fn arg_backend_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::BackendHealthCheckTimeout.to_string())
        .long(ConfigKey::BackendHealthCheckTimeout.to_string())
        .env("CODEPILOT_BACKEND_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .help(
            format!("Time to wait in milliseconds before timing out when doing a healthcheck for a backend. [default: {}]", Config::default(ConfigKey::BackendHealthCheckTimeout)),
        )
        .global(true);
}

fn arg_generation_timeout() -> Arg {
    return Arg::new(ConfigKey::GenerationTimeout.to_string())
        .long(ConfigKey::GenerationTimeout.to_string())
        .env("CODEPILOT_GENERATION_TIMEOUT")
        .num_args(1)
        .help(
            format!("Time to wait in milliseconds for the model. Bounds the whole reply when not streaming, and the gap between fragments when streaming. [default: {}]", Config::default(ConfigKey::GenerationTimeout)),
        )
        .global(true);
}

fn arg_language() -> Arg {
    return Arg::new(ConfigKey::Language.to_string())
        .short('l')
        .long(ConfigKey::Language.to_string())
        .env("CODEPILOT_LANGUAGE")
        .num_args(1)
        .help(format!(
            "The language to generate code in. [default: {}]",
            Config::default(ConfigKey::Language)
        ))
        .value_parser(PossibleValuesParser::new(Language::VARIANTS))
        .global(true);
}

fn arg_model() -> Arg {
    return Arg::new(ConfigKey::Model.to_string())
        .short('m')
        .long(ConfigKey::Model.to_string())
        .env("CODEPILOT_MODEL")
        .num_args(1)
        .help("The model on the backend to generate with. Defaults to a code capable model of the backend if not set.")
        .global(true);
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("SESSION {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("codepilot")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("session").about("Start an interactive generation session."))
        .subcommand(subcommand_generate())
        .subcommand(subcommand_history())
        .subcommand(subcommand_preview())
        .subcommand(subcommand_serve())
        .subcommand(Command::new("languages").about("List the languages code can be generated in."))
        .subcommand(subcommand_config())
        .subcommand(subcommand_completions())
        .arg(arg_backend())
        .arg(arg_backend_health_check_timeout())
        .arg(arg_generation_timeout())
        .arg(arg_language())
        .arg(arg_model())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("CODEPILOT_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::DataDir.to_string())
                .long(ConfigKey::DataDir.to_string())
                .env("CODEPILOT_DATA_DIR")
                .num_args(1)
                .help(format!("Directory history, preview hand-offs and rendered previews are stored in. [default: {}]", Config::default(ConfigKey::DataDir)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::GeminiURL.to_string())
                .long(ConfigKey::GeminiURL.to_string())
                .env("CODEPILOT_GEMINI_URL")
                .num_args(1)
                .help(format!("Google Gemini API URL when using the Gemini backend. [default: {}]", Config::default(ConfigKey::GeminiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::GeminiToken.to_string())
                .long(ConfigKey::GeminiToken.to_string())
                .env("CODEPILOT_GEMINI_TOKEN")
                .num_args(1)
                .help("Google Gemini API token when using the Gemini backend.")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::OllamaURL.to_string())
                .long(ConfigKey::OllamaURL.to_string())
                .env("CODEPILOT_OLLAMA_URL")
                .num_args(1)
                .help(format!("Ollama API URL when using the Ollama backend. [default: {}]", Config::default(ConfigKey::OllamaURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::OpenaiURL.to_string())
                .long(ConfigKey::OpenaiURL.to_string())
                .env("CODEPILOT_OPENAI_URL")
                .num_args(1)
                .help(format!("OpenAI API URL when using the OpenAI backend. Can be swapped to a compatible proxy. [default: {}]", Config::default(ConfigKey::OpenaiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::OpenaiToken.to_string())
                .long(ConfigKey::OpenaiToken.to_string())
                .env("CODEPILOT_OPENAI_TOKEN")
                .num_args(1)
                .help("OpenAI API token when using the OpenAI backend.")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ServerAddress.to_string())
                .long(ConfigKey::ServerAddress.to_string())
                .env("CODEPILOT_SERVER_ADDRESS")
                .num_args(1)
                .help(format!("Address `serve` listens on. [default: {}]", Config::default(ConfigKey::ServerAddress)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ServerURL.to_string())
                .long(ConfigKey::ServerURL.to_string())
                .env("CODEPILOT_SERVER_URL")
                .num_args(1)
                .help("URL of a running `codepilot serve`. When set, sessions generate through it instead of calling the backend directly.")
                .global(true),
        );
}

async fn parse_history(
    matches: &ArgMatches,
    history_matches: &ArgMatches,
) -> Result<Option<Launch>> {
    match history_matches.subcommand() {
        Some(("list", _)) => {
            Config::load(build(), vec![matches]).await?;
            print_history_list().await?;
        }
        Some(("show", show_matches)) => {
            Config::load(build(), vec![matches, show_matches]).await?;
            if let Some(id) = show_matches.get_one::<String>("id") {
                print_history_item(id).await?;
            }
        }
        Some(("load", load_matches)) => {
            Config::load(build(), vec![matches, load_matches]).await?;
            let id = match load_matches.get_one::<String>("id") {
                Some(id) => Some(id.to_string()),
                None => select_history_item_interactive().await?,
            };
            if id.is_some() {
                return Ok(Some(Launch::Session { load: id }));
            }
        }
        Some(("clear", _)) => {
            Config::load(build(), vec![matches]).await?;
            let mut history = load_history().await;
            history.clear().await?;
            println!("Cleared all history");
        }
        Some(("path", _)) => {
            Config::load(build(), vec![matches]).await?;
            println!("{}", Config::get(ConfigKey::DataDir));
        }
        _ => {
            subcommand_history().print_long_help()?;
        }
    }

    return Ok(None);
}

/// Parses arguments and loads configuration. Commands that complete on their
/// own return `None`; everything else is handed back as a `Launch`.
pub async fn parse() -> Result<Option<Launch>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("session", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("generate", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let prompt = subcmd_matches
                .get_many::<String>("prompt")
                .map(|words| {
                    return words.map(|e| return e.to_string()).collect::<Vec<String>>();
                })
                .unwrap_or_default()
                .join(" ");

            return Ok(Some(Launch::Generate {
                prompt,
                sync: subcmd_matches.get_flag("sync"),
                preview: subcmd_matches.get_flag("preview"),
                output: subcmd_matches.get_one::<String>("output").cloned(),
            }));
        }
        Some(("history", subcmd_matches)) => {
            return parse_history(&matches, subcmd_matches).await;
        }
        Some(("preview", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Launch::Preview {
                id: subcmd_matches.get_one::<String>("id").cloned(),
            }));
        }
        Some(("serve", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Launch::Serve));
        }
        Some(("languages", _)) => {
            print_languages();
            return Ok(None);
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(Some(Launch::Session { load: None }));
}
