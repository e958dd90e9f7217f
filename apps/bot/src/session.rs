use std::sync::Arc;

use anyhow::Result;
use chat_integration::{ChatPlatform, LocalChat};
use shared::{domain::ChannelId, protocol::ChatEvent};
use tracing::{error, info, warn};
use vote_core::GameController;

use crate::{
    console::{ConsoleCommand, USAGE},
    game::MazeFactory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Glue between the local chat, the console and the game controller. Plays the
/// part of the hosting bot process: every game message the bot posts in its
/// channel opens the next voting round.
pub struct ConsoleSession {
    chat: Arc<LocalChat>,
    controller: Arc<GameController<MazeFactory>>,
    channel_id: ChannelId,
    echo_json: bool,
}

impl ConsoleSession {
    pub fn new(
        chat: Arc<LocalChat>,
        controller: Arc<GameController<MazeFactory>>,
        channel_id: ChannelId,
        echo_json: bool,
    ) -> Self {
        Self {
            chat,
            controller,
            channel_id,
            echo_json,
        }
    }

    pub async fn post_initial_state(&self) -> Result<()> {
        let content = self.controller.start().await;
        self.chat.send_message(self.channel_id, &content).await?;
        Ok(())
    }

    pub async fn on_chat_event(&self, event: ChatEvent) -> Result<Flow> {
        if self.echo_json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            ChatEvent::MessageCreated { message }
                if message.author_id == self.chat.bot_user_id()
                    && message.channel_id == self.channel_id =>
            {
                if !self.echo_json {
                    println!("{}\n", message.content);
                }
                let message_id = message.message_id;
                if let Err(err) = self.controller.handle_new_game_message(message).await {
                    error!(message_id = message_id.0, "failed to open voting round: {err}");
                }
                if self.controller.is_game_over().await {
                    info!("game finished");
                    return Ok(Flow::Finished);
                }
            }
            ChatEvent::Resumed => match self.controller.resume().await {
                Ok(true) => info!("replayed a pending vote after resume"),
                Ok(false) => {}
                Err(err) => error!("failed to replay pending vote: {err}"),
            },
            _ => {}
        }
        Ok(Flow::Continue)
    }

    pub async fn on_command(&self, command: ConsoleCommand) -> Result<Flow> {
        match command {
            ConsoleCommand::React { user_id, emoji } => {
                if !self.controller.config().emojis().any(|control| control == emoji) {
                    let controls: Vec<&str> = self.controller.config().emojis().collect();
                    println!("'{emoji}' is not a control; use one of {}", controls.join(" "));
                    return Ok(Flow::Continue);
                }
                if user_id == self.chat.bot_user_id() {
                    println!("user {user_id} is the bot; its reactions are not votes");
                    return Ok(Flow::Continue);
                }
                let Some(message) = self.controller.current_message().await else {
                    warn!("no game message to react to yet");
                    return Ok(Flow::Continue);
                };
                if let Err(err) = self
                    .chat
                    .add_reaction(user_id, message.message_id, &emoji)
                    .await
                {
                    warn!(
                        user_id = user_id.0,
                        emoji = emoji.as_str(),
                        "failed to add reaction: {err:#}"
                    );
                }
            }
            ConsoleCommand::Unreact { user_id, emoji } => {
                let Some(message) = self.controller.current_message().await else {
                    return Ok(Flow::Continue);
                };
                if let Err(err) = self
                    .chat
                    .remove_reaction(user_id, message.message_id, &emoji)
                    .await
                {
                    warn!(
                        user_id = user_id.0,
                        emoji = emoji.as_str(),
                        "failed to remove reaction: {err:#}"
                    );
                }
            }
            ConsoleCommand::StopVoting => self.controller.stop_vote_collection().await,
            ConsoleCommand::Restart => {
                self.controller.stop_vote_collection().await;
                let content = self.controller.restart().await;
                self.chat.send_message(self.channel_id, &content).await?;
            }
            ConsoleCommand::Resume => self.chat.emit_resumed(),
            ConsoleCommand::Help => println!("{USAGE}"),
            ConsoleCommand::Quit => return Ok(Flow::Finished),
        }
        Ok(Flow::Continue)
    }

    pub async fn shutdown(&self) {
        self.controller.stop_vote_collection().await;
        info!("session closed");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
