//! EpiQuoi CLI application
//!
//! A terminal front-end for the EpiQuoi chat assistant.
//!
//! # Modes
//!
//! ## Interactive (default)
//! `epiquoi` starts a conversation loop. The conversation is kept in memory
//! and sent as context with every question. Ctrl-C interrupts the answer in
//! progress; at the prompt it exits.
//!
//! ## One-shot
//! `epiquoi "question"` asks once, prints the answer and exits with a
//! non-zero status if the exchange fails.
//!
//! When an exchange fails in interactive mode, the assistant offers an
//! offline lookup of the closest campus by postal code.

mod args;
mod console;
mod fallback;
mod session;

use anyhow::{Context, Result};
use args::{Cli, LogFormat};
use clap::Parser;
use console::{Console, INITIAL_STATUS};
use epiquoi_core::{
    CancellationToken, ChatClient, ClientConfig, ConfigLoader, ConfigOverrides, ProgressEvent,
    ProgressSink, config::default_config_path,
};
use session::{ChatSession, Step, Turn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = load_config(&cli)?;
    let console = Console::new(cli.verbose);
    console.info(&format!("Backend: {}", config.base_url));

    let client = ChatClient::new(config).context("Failed to create chat client")?;
    let streaming = !cli.no_stream;

    match cli.message.as_deref() {
        Some(message) => run_once(&client, &console, message, streaming).await,
        None => run_interactive(&client, &console, streaming).await,
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over `--verbose`
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut loader = ConfigLoader::new().with_defaults();

    loader = match (&cli.config, default_config_path()) {
        (Some(path), _) => loader.with_file(path),
        (None, Some(path)) => loader.with_optional_file(path),
        (None, None) => loader,
    };

    loader
        .with_env()
        .with_overrides(ConfigOverrides {
            base_url: cli.base_url.clone(),
            ..Default::default()
        })
        .load()
        .context("Failed to load configuration")
}

async fn run_once(
    client: &ChatClient,
    console: &Console,
    message: &str,
    streaming: bool,
) -> Result<()> {
    let mut session = ChatSession::new();

    match exchange(&mut session, client, console, message, streaming).await {
        Turn::Offline { error, .. } => {
            Err(anyhow::Error::new(error).context("Could not get an answer from the backend"))
        }
        turn => {
            render(console, &turn);
            Ok(())
        }
    }
}

async fn run_interactive(client: &ChatClient, console: &Console, streaming: bool) -> Result<()> {
    console.print_banner(&client.config().base_url);
    if !client.health_check().await {
        console.warn("Le serveur ne répond pas, les réponses risquent d'échouer.");
    }

    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        console.prompt().context("Failed to write prompt")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        // End of input
        let Some(line) = line else { break };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                console.info("Conversation réinitialisée.");
                continue;
            }
            _ => {}
        }

        let turn = exchange(&mut session, client, console, &line, streaming).await;
        render(console, &turn);
    }

    debug!("Session ended with {} messages", session.history().len());
    Ok(())
}

/// Submit one line, showing progress and cancelling on Ctrl-C
async fn exchange(
    session: &mut ChatSession,
    client: &ChatClient,
    console: &Console,
    line: &str,
    streaming: bool,
) -> Turn {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    if session.step() == Step::Chat && !line.trim().is_empty() {
        console.status(INITIAL_STATUS);
    }

    let mut on_progress = |event: &ProgressEvent| console.status(&event.label);
    let sink: Option<ProgressSink<'_>> = if streaming {
        Some(&mut on_progress)
    } else {
        None
    };

    let turn = session.submit(client, line, sink, cancel).await;

    watcher.abort();
    console.clear_status();
    turn
}

fn render(console: &Console, turn: &Turn) {
    match turn {
        Turn::Ignored => {}
        Turn::Answer(message) | Turn::Campus(message) => console.bot(&message.text),
        Turn::Offline { error, message } => {
            console.info(&format!("{} [{}]", error, error.error_code()));
            console.bot_error(&message.text);
        }
        Turn::Cancelled => console.warn("Requête annulée."),
    }
}
