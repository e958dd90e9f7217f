use async_trait::async_trait;
use shared::{
    domain::{ChannelId, UserId},
    protocol::{ChatEvent, ChatMessage},
};
use tokio::sync::broadcast;
use tracing::warn;

mod local;
pub use local::LocalChat;

/// Operations the game controller needs from a chat platform client.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Identity the bot posts and reacts as.
    fn bot_user_id(&self) -> UserId;
    async fn send_message(
        &self,
        channel_id: ChannelId,
        content: &str,
    ) -> anyhow::Result<ChatMessage>;
    async fn react(&self, message: &ChatMessage, emoji: &str) -> anyhow::Result<()>;
    /// Posts `content` into the channel of `message` without mentioning its author.
    async fn reply(&self, message: &ChatMessage, content: &str) -> anyhow::Result<ChatMessage>;
    async fn delete(&self, message: &ChatMessage) -> anyhow::Result<()>;
    /// Registers a reaction listener for `message`. The receiver may carry events for
    /// other messages; consumers filter by message id.
    async fn watch_reactions(
        &self,
        message: &ChatMessage,
    ) -> anyhow::Result<broadcast::Receiver<ChatEvent>>;
    fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent>;
}

/// Reacts to `message` with each emoji in order. Failures are logged and skipped.
/// Returns how many reactions were added.
pub async fn react_with_emojis<'a, I>(
    platform: &dyn ChatPlatform,
    message: &ChatMessage,
    emojis: I,
) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut added = 0;
    for emoji in emojis {
        match platform.react(message, emoji).await {
            Ok(()) => added += 1,
            Err(err) => warn!(
                message_id = message.message_id.0,
                emoji,
                "chat: failed to add reaction: {err:#}"
            ),
        }
    }
    added
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
