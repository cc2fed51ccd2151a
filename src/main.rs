#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Error;
use anyhow::Result;
use domain::models::BackendName;
use domain::models::SourceBox;
use domain::services::clipboard::ClipboardService;
use domain::services::Gateway;
use infrastructure::backends::BackendManager;
use infrastructure::gateway_client::GatewayClient;
use yansi::Paint;

use crate::application::cli;
use crate::application::cli::Launch;
use crate::application::preview;
use crate::application::server;
use crate::application::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! CodePilot has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

/// Gateway calling the configured backend in process.
async fn build_gateway() -> Result<Gateway> {
    let Some(name) = BackendName::parse(Config::get(ConfigKey::Backend)) else {
        bail!(format!(
            "Unknown backend '{}'",
            Config::get(ConfigKey::Backend)
        ));
    };

    let backend = BackendManager::get(name);
    backend.health_check().await?;

    return Ok(Gateway::new(
        backend,
        Duration::from_millis(Config::get_u64(ConfigKey::GenerationTimeout)),
    ));
}

/// Where sessions generate from: a running server when one is configured,
/// otherwise the backend directly.
async fn build_source() -> Result<SourceBox> {
    if !Config::get(ConfigKey::ServerURL).is_empty() {
        let client = GatewayClient::default();
        client.health_check().await?;
        return Ok(Arc::new(client));
    }

    return Ok(Arc::new(build_gateway().await?));
}

fn start_clipboard() {
    if let Err(clipboard_err) = ClipboardService::healthcheck() {
        tracing::warn!(err = ?clipboard_err, "Clipboard service is unable to start");
        return;
    }

    tokio::spawn(async move {
        if let Err(err) = ClipboardService::start().await {
            tracing::error!(error = ?err, "Clipboard service stopped");
        }
    });
}

async fn run(launch: Launch) -> Result<bool> {
    match launch {
        Launch::Session { load } => {
            start_clipboard();
            ui::start(build_source().await?, load).await?;
        }
        Launch::Generate {
            prompt,
            sync,
            preview,
            output,
        } => {
            let source = build_source().await?;
            return ui::generate_once(source, &prompt, sync, preview, output).await;
        }
        Launch::Preview { id } => {
            preview::start(id).await?;
        }
        Launch::Serve => {
            let gateway = build_gateway().await?;
            server::start(Arc::new(gateway), &Config::get(ConfigKey::ServerAddress)).await?;
        }
    }

    return Ok(true);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("CODEPILOT_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("codepilot")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    let file_logging = env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("codepilot");
    if file_logging {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let launch = match cli::parse().await {
        Ok(Some(launch)) => launch,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    if launch == Launch::Serve && !file_logging {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(launch).await {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => handle_error(err),
    }
}
