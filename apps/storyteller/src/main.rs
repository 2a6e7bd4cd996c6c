use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::StorySession;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast::error::RecvError, mpsc},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::load_settings;
use console::{Command, Console, HELP};

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the interactive story server")]
struct Args {
    /// Origin of the story server, e.g. http://127.0.0.1:8000
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    reveal_speed_ms: Option<u64>,
    #[arg(long)]
    reconnect_delay_secs: Option<u64>,
    /// Settings file; defaults to ./storyteller.toml when present
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(v) = args.origin {
        settings.origin = v;
    }
    if let Some(v) = args.reveal_speed_ms {
        settings.reveal_speed_ms = v;
    }
    if let Some(v) = args.reconnect_delay_secs {
        settings.reconnect_delay_secs = v;
    }

    let session = StorySession::connect(settings.client_config())
        .with_context(|| format!("invalid story origin '{}'", settings.origin))?;
    info!(origin = %settings.origin, "storyteller: connecting");
    println!("[channel {}]", session.channel_state());

    let mut events = session.subscribe_events();
    let mut dialog = session.dialog_surface().subscribe();
    let (actions, actions_rx) = mpsc::channel(16);
    let session_task = tokio::spawn(session.run(actions_rx));

    let mut console = Console::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match console.interpret(&line) {
                    Command::Action(action) => {
                        if actions.send(action).await.is_err() {
                            break;
                        }
                    }
                    Command::Quit => break,
                    Command::Help => println!("{HELP}"),
                    Command::Invalid(reason) => println!("{reason}. {HELP}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(text) = console.render_event(&event) {
                        if console.take_open_reveal_line() {
                            println!();
                        }
                        println!("{text}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "storyteller: renderer fell behind session events");
                }
                Err(RecvError::Closed) => break,
            },
            changed = dialog.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = dialog.borrow_and_update().clone();
                let text = console.render_reveal(&snapshot);
                if !text.is_empty() {
                    print!("{text}");
                    stdout.flush().context("failed to flush stdout")?;
                }
            }
        }
    }

    drop(actions);
    session_task.await.context("session task failed")?;
    info!("storyteller: bye");
    Ok(())
}
