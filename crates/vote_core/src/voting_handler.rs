use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chat_integration::ChatPlatform;
use futures::future::BoxFuture;
use shared::{
    domain::UserId,
    protocol::{ChatEvent, ChatMessage},
};
use tokio::task::JoinHandle;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{debug, info, warn, Instrument, Span};

use crate::{
    config::ControllerConfig,
    error::VotingError,
    tally::{Resolution, VoteTally},
};

/// Receives the round's message and its resolution, exactly once per handler.
pub type OnResolved = Box<dyn FnOnce(ChatMessage, Resolution) -> BoxFuture<'static, ()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerPhase {
    Idle,
    Collecting,
    Resolved,
    Stopped,
}

enum HandlerState {
    Idle,
    Collecting(VoteTally),
    Resolved(Resolution),
    Stopped,
}

impl HandlerState {
    fn phase(&self) -> HandlerPhase {
        match self {
            HandlerState::Idle => HandlerPhase::Idle,
            HandlerState::Collecting(_) => HandlerPhase::Collecting,
            HandlerState::Resolved(_) => HandlerPhase::Resolved,
            HandlerState::Stopped => HandlerPhase::Stopped,
        }
    }
}

fn lock_state(state: &Mutex<HandlerState>) -> MutexGuard<'_, HandlerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collects reaction votes on one message for one timed window.
///
/// The state mutex is the latch: leaving `Collecting` happens under it, so either the
/// window timer resolves the round or `stop` cancels it, never both.
pub struct VotingHandler {
    bot_user_id: UserId,
    config: Arc<ControllerConfig>,
    state: Arc<Mutex<HandlerState>>,
    task: Option<JoinHandle<()>>,
}

impl VotingHandler {
    pub fn new(bot_user_id: UserId, config: Arc<ControllerConfig>) -> Self {
        Self {
            bot_user_id,
            config,
            state: Arc::new(Mutex::new(HandlerState::Idle)),
            task: None,
        }
    }

    /// An inert handler that already resolved, used when restoring a round.
    pub fn resolved(
        bot_user_id: UserId,
        config: Arc<ControllerConfig>,
        resolution: Resolution,
    ) -> Self {
        Self {
            bot_user_id,
            config,
            state: Arc::new(Mutex::new(HandlerState::Resolved(resolution))),
            task: None,
        }
    }

    /// Opens the voting window on `message`. Returns as soon as the listener is
    /// registered; `on_resolved` runs later from the collection task.
    pub async fn collect_votes(
        &mut self,
        platform: &dyn ChatPlatform,
        message: ChatMessage,
        on_resolved: OnResolved,
    ) -> Result<(), VotingError> {
        let phase = self.phase();
        if phase != HandlerPhase::Idle {
            return Err(VotingError::NotIdle(phase));
        }

        let reactions = platform
            .watch_reactions(&message)
            .await
            .map_err(VotingError::ListenerRegistration)?;

        *lock_state(&self.state) =
            HandlerState::Collecting(VoteTally::new(self.bot_user_id, &self.config));

        info!(
            message_id = message.message_id.0,
            window_secs = self.config.vote_window().as_secs_f64(),
            "vote: collecting votes"
        );

        let task = tokio::spawn(
            run_collection(
                Arc::clone(&self.state),
                message,
                BroadcastStream::new(reactions),
                self.config.vote_window(),
                self.config.default_move().map(str::to_string),
                on_resolved,
            )
            .instrument(Span::current()),
        );
        self.task = Some(task);
        Ok(())
    }

    /// Cancels collection. Safe in every phase; after it returns the handler will
    /// not resolve.
    pub fn stop(&self) {
        {
            let mut guard = lock_state(&self.state);
            match *guard {
                HandlerState::Idle | HandlerState::Collecting(_) => *guard = HandlerState::Stopped,
                HandlerState::Resolved(_) | HandlerState::Stopped => return,
            }
        }
        if let Some(task) = &self.task {
            task.abort();
        }
        debug!("vote: collection stopped");
    }

    pub fn chosen_vote(&self) -> Option<Resolution> {
        match &*lock_state(&self.state) {
            HandlerState::Resolved(resolution) => Some(resolution.clone()),
            _ => None,
        }
    }

    pub fn phase(&self) -> HandlerPhase {
        lock_state(&self.state).phase()
    }
}

impl Drop for VotingHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_collection(
    state: Arc<Mutex<HandlerState>>,
    message: ChatMessage,
    mut reactions: BroadcastStream<ChatEvent>,
    window: Duration,
    default_move: Option<String>,
    on_resolved: OnResolved,
) {
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    let mut listening = true;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            next = reactions.next(), if listening => match next {
                Some(Ok(event)) => apply_event(&state, &message, &event),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => warn!(
                    message_id = message.message_id.0,
                    skipped,
                    "vote: reaction listener lagged; some reactions were not counted"
                ),
                None => {
                    warn!(
                        message_id = message.message_id.0,
                        "vote: reaction stream closed before the window ended"
                    );
                    listening = false;
                }
            },
        }
    }
    drop(reactions);

    let resolution = {
        let mut guard = lock_state(&state);
        match std::mem::replace(&mut *guard, HandlerState::Stopped) {
            HandlerState::Collecting(tally) => {
                let resolution = Resolution::from_tally(tally.resolve(), default_move.as_deref());
                info!(
                    message_id = message.message_id.0,
                    counts = ?tally.counts(),
                    resolution = %resolution,
                    "vote: window closed"
                );
                *guard = HandlerState::Resolved(resolution.clone());
                Some(resolution)
            }
            other => {
                *guard = other;
                None
            }
        }
    };

    if let Some(resolution) = resolution {
        on_resolved(message, resolution).await;
    }
}

fn apply_event(state: &Mutex<HandlerState>, message: &ChatMessage, event: &ChatEvent) {
    let Some(reaction) = event.reaction() else {
        return;
    };
    if reaction.message_id != message.message_id {
        return;
    }

    let mut guard = lock_state(state);
    let HandlerState::Collecting(tally) = &mut *guard else {
        return;
    };
    let changed = match event {
        ChatEvent::ReactionAdded(_) => tally.record(reaction.user_id, &reaction.emoji),
        _ => tally.retract(reaction.user_id, &reaction.emoji),
    };
    if changed {
        debug!(
            message_id = message.message_id.0,
            voter = reaction.user_id.0,
            emoji = reaction.emoji.as_str(),
            total = tally.total_votes(),
            "vote: tally updated"
        );
    }
}

#[cfg(test)]
#[path = "tests/voting_handler_tests.rs"]
mod tests;
