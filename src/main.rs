//! Tutor CLI - submit source code to the tutor backend and stream results.
//!
//! This is a thin front end standing in for the editor UI: it reads a
//! source file, opens a session link, submits the requested operation,
//! and prints streamed results until the terminal event arrives. See the
//! `tutor_client` library for the session client itself.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tutor_client::{
    client_session_id, session_url, Config, ConnectionState, OutputKind, RequestCoordinator,
    SessionLink,
};

#[derive(Parser)]
#[command(name = "tutor", version, about = "Client for the code tutor backend")]
struct Cli {
    /// Backend base URL (overrides config and TUTOR_SERVER_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Language tag for the submission (overrides config)
    #[arg(long, global = true)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a source file on the backend and stream its output
    Run {
        /// Path to the source file
        file: PathBuf,
    },
    /// Ask the backend to explain a source file
    Explain {
        /// Path to the source file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(language) = cli.language {
        config.language = language;
    }

    let (file, explain) = match &cli.command {
        Command::Run { file } => (file, false),
        Command::Explain { file } => (file, true),
    };
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let session_id = client_session_id();
    let url = session_url(&config.server_url, &session_id);
    let (link, mut inbound_rx) = SessionLink::connect(url, config.reconnect_policy());
    let mut state_rx = link.watch_state();

    // Wait until the link opens or gives up
    loop {
        match *state_rx.borrow() {
            ConnectionState::Open => break,
            ConnectionState::Closed => bail!("backend closed the connection before it opened"),
            ConnectionState::Exhausted => {
                bail!("could not reach the backend at {}", config.server_url)
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {}
        }
        state_rx
            .changed()
            .await
            .context("link task ended unexpectedly")?;
    }
    eprintln!("connected as {session_id}");

    let mut coordinator = RequestCoordinator::new(&link, config.language.clone());
    submit(&mut coordinator, explain, &code)?;

    let mut printed = 0;
    while coordinator.is_executing() || coordinator.is_explaining() {
        tokio::select! {
            frame = inbound_rx.recv() => {
                let Some(raw) = frame else { bail!("connection lost") };
                coordinator.handle_raw(&raw);
                for entry in &coordinator.output()[printed..] {
                    let tag = match entry.kind {
                        OutputKind::Info => "info",
                        OutputKind::Result => "result",
                        OutputKind::Error => "error",
                    };
                    println!("[{tag}] {}", entry.content);
                }
                printed = coordinator.output().len();
            }

            changed = state_rx.changed() => {
                changed.context("link task ended unexpectedly")?;
                let state = *state_rx.borrow();
                match state {
                    ConnectionState::Exhausted => {
                        bail!("connection lost and reconnect attempts exhausted")
                    }
                    ConnectionState::Closed => bail!("backend closed the connection"),
                    ConnectionState::Reconnecting => eprintln!("disconnected, reconnecting..."),
                    ConnectionState::Open => {
                        // New connection, new backend state: the old request
                        // is gone, so resubmit on the user's behalf
                        eprintln!("reconnected, resubmitting");
                        printed = 0;
                        submit(&mut coordinator, explain, &code)?;
                    }
                    ConnectionState::Connecting => {}
                }
            }
        }
    }

    if explain {
        println!("{}", coordinator.explanation());
    }

    link.shutdown();
    Ok(())
}

/// Submit the requested operation through the coordinator.
fn submit(
    coordinator: &mut RequestCoordinator<&SessionLink>,
    explain: bool,
    code: &str,
) -> Result<()> {
    if explain {
        coordinator.submit_explain(code)?;
    } else {
        coordinator.submit_execute(code)?;
    }
    Ok(())
}
