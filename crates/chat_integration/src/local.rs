use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ChannelId, MessageId, UserId},
    error::PlatformError,
    protocol::{ChatEvent, ChatMessage, ReactionPayload},
};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::ChatPlatform;

struct StoredMessage {
    message: ChatMessage,
    reactions: Vec<(UserId, String)>,
}

#[derive(Default)]
struct LocalChatState {
    next_message_id: i64,
    messages: HashMap<MessageId, StoredMessage>,
    order: Vec<MessageId>,
}

/// In-process chat platform. Keeps messages and reactions in memory and publishes
/// every change on a broadcast channel, the way a gateway connection would.
pub struct LocalChat {
    bot_user_id: UserId,
    inner: Mutex<LocalChatState>,
    events: broadcast::Sender<ChatEvent>,
}

impl LocalChat {
    pub fn new(bot_user_id: UserId) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            bot_user_id,
            inner: Mutex::new(LocalChatState {
                next_message_id: 1,
                ..LocalChatState::default()
            }),
            events,
        })
    }

    pub async fn post_as(
        &self,
        author_id: UserId,
        channel_id: ChannelId,
        content: &str,
    ) -> ChatMessage {
        let message = {
            let mut guard = self.inner.lock().await;
            let message_id = MessageId(guard.next_message_id);
            guard.next_message_id += 1;
            let message = ChatMessage {
                message_id,
                channel_id,
                author_id,
                content: content.to_string(),
                sent_at: Utc::now(),
            };
            guard.messages.insert(
                message_id,
                StoredMessage {
                    message: message.clone(),
                    reactions: Vec::new(),
                },
            );
            guard.order.push(message_id);
            message
        };
        debug!(
            message_id = message.message_id.0,
            channel_id = channel_id.0,
            author_id = author_id.0,
            "chat: message created"
        );
        let _ = self.events.send(ChatEvent::MessageCreated {
            message: message.clone(),
        });
        message
    }

    pub async fn add_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<()> {
        let payload = {
            let mut guard = self.inner.lock().await;
            let stored = guard
                .messages
                .get_mut(&message_id)
                .ok_or_else(|| unknown_message(message_id))?;
            let exists = stored
                .reactions
                .iter()
                .any(|(user, existing)| *user == user_id && existing == emoji);
            if exists {
                return Ok(());
            }
            stored.reactions.push((user_id, emoji.to_string()));
            reaction_payload(&stored.message, user_id, emoji)
        };
        let _ = self.events.send(ChatEvent::ReactionAdded(payload));
        Ok(())
    }

    pub async fn remove_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<()> {
        let payload = {
            let mut guard = self.inner.lock().await;
            let stored = guard
                .messages
                .get_mut(&message_id)
                .ok_or_else(|| unknown_message(message_id))?;
            let before = stored.reactions.len();
            stored
                .reactions
                .retain(|(user, existing)| !(*user == user_id && existing == emoji));
            if stored.reactions.len() == before {
                return Ok(());
            }
            reaction_payload(&stored.message, user_id, emoji)
        };
        let _ = self.events.send(ChatEvent::ReactionRemoved(payload));
        Ok(())
    }

    pub async fn messages(&self, channel_id: ChannelId) -> Vec<ChatMessage> {
        let guard = self.inner.lock().await;
        guard
            .order
            .iter()
            .filter_map(|id| guard.messages.get(id))
            .map(|stored| stored.message.clone())
            .filter(|message| message.channel_id == channel_id)
            .collect()
    }

    pub async fn reactions(&self, message_id: MessageId) -> Vec<(UserId, String)> {
        let guard = self.inner.lock().await;
        guard
            .messages
            .get(&message_id)
            .map(|stored| stored.reactions.clone())
            .unwrap_or_default()
    }

    pub async fn contains(&self, message_id: MessageId) -> bool {
        self.inner.lock().await.messages.contains_key(&message_id)
    }

    /// Publishes a connection-resumed event.
    pub fn emit_resumed(&self) {
        let _ = self.events.send(ChatEvent::Resumed);
    }
}

fn unknown_message(message_id: MessageId) -> anyhow::Error {
    PlatformError::not_found(format!("unknown message {}", message_id.0)).into()
}

fn reaction_payload(message: &ChatMessage, user_id: UserId, emoji: &str) -> ReactionPayload {
    ReactionPayload {
        message_id: message.message_id,
        channel_id: message.channel_id,
        user_id,
        emoji: emoji.to_string(),
    }
}

#[async_trait]
impl ChatPlatform for LocalChat {
    fn bot_user_id(&self) -> UserId {
        self.bot_user_id
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<ChatMessage> {
        Ok(self.post_as(self.bot_user_id, channel_id, content).await)
    }

    async fn react(&self, message: &ChatMessage, emoji: &str) -> Result<()> {
        self.add_reaction(self.bot_user_id, message.message_id, emoji)
            .await
    }

    async fn reply(&self, message: &ChatMessage, content: &str) -> Result<ChatMessage> {
        if !self.contains(message.message_id).await {
            return Err(unknown_message(message.message_id));
        }
        Ok(self
            .post_as(self.bot_user_id, message.channel_id, content)
            .await)
    }

    async fn delete(&self, message: &ChatMessage) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            guard
                .messages
                .remove(&message.message_id)
                .ok_or_else(|| unknown_message(message.message_id))?;
            guard.order.retain(|id| *id != message.message_id);
        }
        let _ = self.events.send(ChatEvent::MessageDeleted {
            channel_id: message.channel_id,
            message_id: message.message_id,
        });
        Ok(())
    }

    async fn watch_reactions(
        &self,
        message: &ChatMessage,
    ) -> Result<broadcast::Receiver<ChatEvent>> {
        if !self.contains(message.message_id).await {
            return Err(unknown_message(message.message_id));
        }
        Ok(self.events.subscribe())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }
}
