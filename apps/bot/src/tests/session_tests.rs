use std::{sync::Arc, time::Duration};

use chat_integration::{ChatPlatform, LocalChat};
use shared::{
    domain::{ChannelId, UserId},
    protocol::ChatEvent,
};
use tokio::sync::broadcast;
use vote_core::GameController;

use super::{ConsoleSession, Flow};
use crate::{console::ConsoleCommand, game::MazeFactory, settings::BotSettings};

const BOT: UserId = UserId(500);
const CHANNEL: ChannelId = ChannelId(9);

fn session_with(max_turns: u32) -> (Arc<LocalChat>, ConsoleSession) {
    let chat = LocalChat::new(BOT);
    let config = BotSettings::default()
        .controller_config()
        .expect("default config");
    let controller = GameController::new(chat.clone(), MazeFactory { max_turns }, config);
    (chat.clone(), ConsoleSession::new(chat, controller, CHANNEL, false))
}

async fn pump(session: &ConsoleSession, events: &mut broadcast::Receiver<ChatEvent>) -> Flow {
    while let Ok(event) = events.try_recv() {
        let flow = session.on_chat_event(event).await.expect("handle event");
        if flow == Flow::Finished {
            return Flow::Finished;
        }
    }
    Flow::Continue
}

async fn current_content(session: &ConsoleSession) -> String {
    session
        .controller
        .current_message()
        .await
        .expect("open round")
        .content
}

#[tokio::test(start_paused = true)]
async fn bot_message_opens_round_with_control_reactions() {
    let (chat, session) = session_with(40);
    let mut events = chat.subscribe_events();

    session.post_initial_state().await.expect("initial state");
    assert_eq!(pump(&session, &mut events).await, Flow::Continue);

    let message = session
        .controller
        .current_message()
        .await
        .expect("open round");
    let reactions: Vec<String> = chat
        .reactions(message.message_id)
        .await
        .into_iter()
        .map(|(_, emoji)| emoji)
        .collect();
    assert_eq!(reactions, vec!["⬆️", "⬇️", "⬅️", "➡️"]);
    assert!(message.content.contains("turn 0/40"));
}

#[tokio::test(start_paused = true)]
async fn console_reactions_decide_the_next_move() {
    let (chat, session) = session_with(40);
    let mut events = chat.subscribe_events();
    session.post_initial_state().await.expect("initial state");
    pump(&session, &mut events).await;
    let first = session
        .controller
        .current_message()
        .await
        .expect("open round");

    session
        .on_command(ConsoleCommand::React {
            user_id: UserId(7),
            emoji: "➡️".into(),
        })
        .await
        .expect("react");
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(pump(&session, &mut events).await, Flow::Continue);

    let latest = session
        .controller
        .current_message()
        .await
        .expect("next round");
    assert_ne!(latest.message_id, first.message_id);
    assert!(latest.content.contains("turn 1/40"));
    assert!(latest.content.contains("last move: right"));
}

#[tokio::test(start_paused = true)]
async fn session_finishes_when_the_game_ends() {
    let (chat, session) = session_with(1);
    let mut events = chat.subscribe_events();
    session.post_initial_state().await.expect("initial state");
    assert_eq!(pump(&session, &mut events).await, Flow::Continue);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(pump(&session, &mut events).await, Flow::Finished);
    assert!(current_content(&session).await.contains("out of turns"));
}

#[tokio::test(start_paused = true)]
async fn restart_posts_a_fresh_board() {
    let (chat, session) = session_with(40);
    let mut events = chat.subscribe_events();
    session.post_initial_state().await.expect("initial state");
    pump(&session, &mut events).await;
    tokio::time::sleep(Duration::from_secs(11)).await;
    pump(&session, &mut events).await;
    assert!(current_content(&session).await.contains("turn 1/40"));

    let flow = session
        .on_command(ConsoleCommand::Restart)
        .await
        .expect("restart");
    assert_eq!(flow, Flow::Continue);
    pump(&session, &mut events).await;
    assert!(current_content(&session).await.contains("turn 0/40"));
}

#[tokio::test]
async fn quit_ends_the_session_and_stop_is_harmless_without_a_round() {
    let (_chat, session) = session_with(40);

    let stopped = session
        .on_command(ConsoleCommand::StopVoting)
        .await
        .expect("stop");
    assert_eq!(stopped, Flow::Continue);
    let unreacted = session
        .on_command(ConsoleCommand::Unreact {
            user_id: UserId(3),
            emoji: "⬆️".into(),
        })
        .await
        .expect("unreact");
    assert_eq!(unreacted, Flow::Continue);
    assert_eq!(
        session.on_command(ConsoleCommand::Quit).await.expect("quit"),
        Flow::Finished
    );
}

#[tokio::test(start_paused = true)]
async fn console_reactions_skip_non_controls_and_the_bot_itself() {
    let (chat, session) = session_with(40);
    let mut events = chat.subscribe_events();
    session.post_initial_state().await.expect("initial state");
    pump(&session, &mut events).await;
    let message = session
        .controller
        .current_message()
        .await
        .expect("open round");
    let before = chat.reactions(message.message_id).await.len();

    for (user_id, emoji) in [(UserId(3), "🍕"), (BOT, "⬅️")] {
        let flow = session
            .on_command(ConsoleCommand::React {
                user_id,
                emoji: emoji.into(),
            })
            .await
            .expect("react");
        assert_eq!(flow, Flow::Continue);
    }
    assert_eq!(chat.reactions(message.message_id).await.len(), before);

    session
        .on_command(ConsoleCommand::React {
            user_id: UserId(1),
            emoji: "⬅️".into(),
        })
        .await
        .expect("react");
    assert!(chat
        .reactions(message.message_id)
        .await
        .contains(&(UserId(1), "⬅️".to_string())));
}
