use std::path::PathBuf;

use anyhow::Result;
use chat_integration::{ChatPlatform, LocalChat};
use clap::Parser;
use shared::domain::{ChannelId, UserId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast::error::RecvError, mpsc},
};
use tracing::{info_span, warn};
use tracing_subscriber::EnvFilter;
use vote_core::GameController;

mod console;
mod game;
mod session;
mod settings;

use console::{parse_command, ConsoleCommand, USAGE};
use game::MazeFactory;
use session::{ConsoleSession, Flow};
use settings::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Play a maze in a local chat channel by voting with reactions")]
struct Args {
    /// Settings file (TOML). Defaults to ./bot.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print every chat event as a JSON line instead of the rendered board.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref())?;
    let controller_config = settings.controller_config()?;
    let channel_id = ChannelId(settings.channel_id);

    let chat = LocalChat::new(UserId(settings.bot_user_id));
    let controller = GameController::new_with_span(
        chat.clone(),
        MazeFactory {
            max_turns: settings.maze.max_turns,
        },
        controller_config,
        info_span!("game_controller", channel_id = channel_id.0),
    );
    let session = ConsoleSession::new(chat.clone(), controller, channel_id, args.json);

    let mut events = chat.subscribe_events();
    let (command_tx, mut command_rx) = mpsc::channel(64);
    tokio::spawn(read_console(command_tx));
    let mut console_open = true;

    eprintln!("{USAGE}");
    session.post_initial_state().await?;

    loop {
        let flow = tokio::select! {
            event = events.recv() => match event {
                Ok(event) => session.on_chat_event(event).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "chat event stream lagged");
                    Flow::Continue
                }
                Err(RecvError::Closed) => Flow::Finished,
            },
            command = command_rx.recv(), if console_open => match command {
                Some(command) => session.on_command(command).await?,
                None => {
                    console_open = false;
                    Flow::Continue
                }
            },
            _ = tokio::signal::ctrl_c() => Flow::Finished,
        };
        if flow == Flow::Finished {
            break;
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn read_console(commands: mpsc::Sender<ConsoleCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match parse_command(&line) {
                Ok(command) => {
                    if commands.send(command).await.is_err() {
                        return;
                    }
                }
                Err(err) => eprintln!("{err}; {USAGE}"),
            },
            Ok(None) => return,
            Err(err) => {
                warn!("failed to read console input: {err}");
                return;
            }
        }
    }
}
