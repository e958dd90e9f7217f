use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageCreated { message: ChatMessage },
    MessageDeleted {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    ReactionAdded(ReactionPayload),
    ReactionRemoved(ReactionPayload),
    /// The platform connection was re-established after an interruption.
    Resumed,
}

impl ChatEvent {
    pub fn reaction(&self) -> Option<&ReactionPayload> {
        match self {
            ChatEvent::ReactionAdded(reaction) | ChatEvent::ReactionRemoved(reaction) => {
                Some(reaction)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_event_uses_tagged_wire_shape() {
        let event = ChatEvent::ReactionAdded(ReactionPayload {
            message_id: MessageId(9),
            channel_id: ChannelId(1),
            user_id: UserId(4),
            emoji: "⬅️".into(),
        });

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "reaction_added");
        assert_eq!(value["payload"]["message_id"], 9);
        assert_eq!(value["payload"]["emoji"], "⬅️");
    }

    #[test]
    fn reaction_accessor_skips_non_reaction_events() {
        assert!(ChatEvent::Resumed.reaction().is_none());
        let removed = ChatEvent::ReactionRemoved(ReactionPayload {
            message_id: MessageId(2),
            channel_id: ChannelId(1),
            user_id: UserId(3),
            emoji: "➡️".into(),
        });
        assert_eq!(removed.reaction().map(|r| r.user_id), Some(UserId(3)));
    }
}
