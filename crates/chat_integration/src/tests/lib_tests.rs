use super::*;
use shared::{domain::MessageId, error::PlatformError};

const BOT: UserId = UserId(1000);
const CHANNEL: ChannelId = ChannelId(7);

#[tokio::test]
async fn reply_posts_into_same_channel_as_bot() {
    let chat = LocalChat::new(BOT);
    let original = chat.post_as(UserId(1), CHANNEL, "hi").await;

    let reply = chat.reply(&original, "state").await.expect("reply");

    assert_eq!(reply.author_id, BOT);
    assert_eq!(reply.channel_id, CHANNEL);
    assert_ne!(reply.message_id, original.message_id);
    let contents: Vec<_> = chat
        .messages(CHANNEL)
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["hi", "state"]);
}

#[tokio::test]
async fn deleted_message_cannot_be_watched_or_replied_to() {
    let chat = LocalChat::new(BOT);
    let message = chat.send_message(CHANNEL, "board").await.expect("send");
    chat.delete(&message).await.expect("delete");

    let err = chat.watch_reactions(&message).await.expect_err("watch");
    let platform = err.downcast_ref::<PlatformError>().expect("platform error");
    assert_eq!(platform.code, shared::error::ErrorCode::NotFound);
    assert!(chat.reply(&message, "next").await.is_err());
    assert!(chat.delete(&message).await.is_err());
}

#[tokio::test]
async fn reactions_are_published_once_per_user_and_emoji() {
    let chat = LocalChat::new(BOT);
    let message = chat.send_message(CHANNEL, "board").await.expect("send");
    let mut events = chat.watch_reactions(&message).await.expect("watch");

    chat.add_reaction(UserId(1), message.message_id, "⬅️")
        .await
        .expect("react");
    chat.add_reaction(UserId(1), message.message_id, "⬅️")
        .await
        .expect("duplicate react");
    chat.remove_reaction(UserId(1), message.message_id, "⬅️")
        .await
        .expect("unreact");

    assert!(matches!(events.recv().await, Ok(ChatEvent::ReactionAdded(_))));
    assert!(matches!(events.recv().await, Ok(ChatEvent::ReactionRemoved(_))));
    assert!(events.try_recv().is_err());
    assert!(chat.reactions(message.message_id).await.is_empty());
}

#[tokio::test]
async fn react_with_emojis_keeps_order_and_counts_successes() {
    let chat = LocalChat::new(BOT);
    let message = chat.send_message(CHANNEL, "board").await.expect("send");

    let added = react_with_emojis(chat.as_ref(), &message, ["⬆️", "⬇️", "⬅️"]).await;

    assert_eq!(added, 3);
    let emojis: Vec<_> = chat
        .reactions(message.message_id)
        .await
        .into_iter()
        .map(|(user, emoji)| {
            assert_eq!(user, BOT);
            emoji
        })
        .collect();
    assert_eq!(emojis, vec!["⬆️", "⬇️", "⬅️"]);
}

#[tokio::test]
async fn react_with_emojis_skips_failures() {
    let chat = LocalChat::new(BOT);
    let message = chat.send_message(CHANNEL, "board").await.expect("send");
    chat.delete(&message).await.expect("delete");

    let added = react_with_emojis(chat.as_ref(), &message, ["⬆️", "⬇️"]).await;

    assert_eq!(added, 0);
    assert!(!chat.contains(MessageId(message.message_id.0)).await);
}
