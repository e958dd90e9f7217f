use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use chat_integration::{react_with_emojis, ChatPlatform};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use shared::protocol::ChatMessage;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::{
    config::ControllerConfig,
    engine::{GameEngine, GameFactory},
    error::ControllerError,
    tally::Resolution,
    voting_handler::{OnResolved, VotingHandler},
};

struct Round {
    message: ChatMessage,
    handler: Option<VotingHandler>,
    advanced: bool,
}

struct ControllerState<G> {
    game: G,
    round: Option<Round>,
}

/// Serializable view of the current round, enough to replay a resolved vote after
/// a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    pub advanced: bool,
}

/// Drives one game in one channel: every bot message showing the game opens a
/// voting round, and the round's resolution advances the game.
pub struct GameController<F: GameFactory> {
    platform: Arc<dyn ChatPlatform>,
    factory: F,
    config: Arc<ControllerConfig>,
    span: Span,
    inner: Mutex<ControllerState<F::Game>>,
}

impl<F: GameFactory> GameController<F> {
    pub fn new(platform: Arc<dyn ChatPlatform>, factory: F, config: ControllerConfig) -> Arc<Self> {
        Self::new_with_span(platform, factory, config, info_span!("game_controller"))
    }

    pub fn new_with_span(
        platform: Arc<dyn ChatPlatform>,
        factory: F,
        config: ControllerConfig,
        span: Span,
    ) -> Arc<Self> {
        let game = factory.create();
        Arc::new(Self {
            platform,
            factory,
            config: Arc::new(config),
            span,
            inner: Mutex::new(ControllerState { game, round: None }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Opens a voting round on `message`, closing the previous round first.
    pub async fn handle_new_game_message(
        self: &Arc<Self>,
        message: ChatMessage,
    ) -> Result<(), ControllerError> {
        self.open_round(message)
            .instrument(self.span.clone())
            .await
    }

    async fn open_round(self: &Arc<Self>, message: ChatMessage) -> Result<(), ControllerError> {
        let mut guard = self.inner.lock().await;
        if let Some(previous) = guard.round.take() {
            if let Some(handler) = previous.handler {
                handler.stop();
            }
        }
        guard.round = Some(Round {
            message: message.clone(),
            handler: None,
            advanced: false,
        });

        if guard.game.is_over() {
            info!(
                message_id = message.message_id.0,
                "game: over; not collecting votes"
            );
            return Ok(());
        }

        react_with_emojis(self.platform.as_ref(), &message, self.config.emojis()).await;

        let mut handler = VotingHandler::new(self.platform.bot_user_id(), Arc::clone(&self.config));
        handler
            .collect_votes(self.platform.as_ref(), message, self.resolution_callback())
            .await?;
        if let Some(round) = guard.round.as_mut() {
            round.handler = Some(handler);
        }
        Ok(())
    }

    fn resolution_callback(self: &Arc<Self>) -> OnResolved {
        let controller = Arc::downgrade(self);
        Box::new(move |message: ChatMessage, resolution: Resolution| {
            async move {
                let Some(controller) = controller.upgrade() else {
                    debug!("game: controller dropped before the round resolved");
                    return;
                };
                if let Err(err) = controller.advance_game(&message, resolution.clone()).await {
                    error!(
                        message_id = message.message_id.0,
                        game_move = %resolution,
                        "game: failed to advance: {err}"
                    );
                }
            }
            .boxed()
        })
    }

    /// Applies `resolution` to the game and posts the new state.
    ///
    /// Only the current, not yet advanced round can move the game; anything else is
    /// logged and skipped. Returns whether the game ticked.
    pub async fn advance_game(
        &self,
        message: &ChatMessage,
        resolution: Resolution,
    ) -> Result<bool, ControllerError> {
        self.apply_resolution(message, resolution)
            .instrument(self.span.clone())
            .await
    }

    async fn apply_resolution(
        &self,
        message: &ChatMessage,
        resolution: Resolution,
    ) -> Result<bool, ControllerError> {
        let (rendered, game_over) = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            match state.round.as_mut() {
                Some(round) if round.message.message_id == message.message_id => {
                    if round.advanced {
                        warn!(
                            message_id = message.message_id.0,
                            game_move = %resolution,
                            "game: round already advanced; ignoring resolution"
                        );
                        return Ok(false);
                    }
                    round.advanced = true;
                }
                _ => {
                    warn!(
                        message_id = message.message_id.0,
                        game_move = %resolution,
                        "game: resolution does not belong to the current round; ignoring"
                    );
                    return Ok(false);
                }
            }

            info!(
                message_id = message.message_id.0,
                game_move = %resolution,
                "game: advancing with move"
            );
            state.game.tick(resolution.game_move());
            (state.game.render(), state.game.is_over())
        };

        self.platform
            .reply(message, &rendered)
            .await
            .map_err(|source| ControllerError::Reply {
                message_id: message.message_id,
                game_move: resolution.to_string(),
                source,
            })?;

        if !game_over && self.config.delete_previous_messages() {
            if let Err(err) = self.platform.delete(message).await {
                warn!(
                    message_id = message.message_id.0,
                    "game: failed to delete previous message: {err:#}"
                );
            }
        }
        Ok(true)
    }

    /// Best-effort stop of the current round's handler. Never fails.
    pub async fn stop_vote_collection(&self) {
        let guard = self.inner.lock().await;
        let Some(handler) = guard
            .round
            .as_ref()
            .and_then(|round| round.handler.as_ref())
        else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| handler.stop())) {
            Ok(()) => debug!(parent: &self.span, "game: stopped voting handler"),
            Err(_) => error!(parent: &self.span, "game: failed to stop voting handler"),
        }
    }

    /// Starts the game and returns its first rendered state.
    pub async fn start(&self) -> String {
        let mut guard = self.inner.lock().await;
        guard.game.start();
        guard.game.render()
    }

    /// Replaces the game with a fresh one and returns its first rendered state.
    /// The current round is retired with the old game, so none of its votes can
    /// move the new one.
    pub async fn restart(&self) -> String {
        info!(parent: &self.span, "game: restarting");
        let mut guard = self.inner.lock().await;
        if let Some(handler) = guard.round.take().and_then(|round| round.handler) {
            handler.stop();
        }
        let mut game = self.factory.create();
        game.start();
        guard.game = game;
        guard.game.render()
    }

    /// Replays a round that resolved but never advanced the game. Returns whether a
    /// replay happened; calling it again afterwards does nothing.
    pub async fn resume(&self) -> Result<bool, ControllerError> {
        self.replay_pending_resolution()
            .instrument(self.span.clone())
            .await
    }

    async fn replay_pending_resolution(&self) -> Result<bool, ControllerError> {
        info!("game: resuming");
        let pending = {
            let guard = self.inner.lock().await;
            match &guard.round {
                Some(round) if !round.advanced && !guard.game.is_over() => round
                    .handler
                    .as_ref()
                    .and_then(VotingHandler::chosen_vote)
                    .map(|resolution| (round.message.clone(), resolution)),
                _ => None,
            }
        };
        let Some((message, resolution)) = pending else {
            return Ok(false);
        };
        info!(
            message_id = message.message_id.0,
            game_move = %resolution,
            "game: replaying resolved vote"
        );
        self.apply_resolution(&message, resolution).await
    }

    pub async fn is_game_over(&self) -> bool {
        self.inner.lock().await.game.is_over()
    }

    pub async fn current_message(&self) -> Option<ChatMessage> {
        let guard = self.inner.lock().await;
        guard.round.as_ref().map(|round| round.message.clone())
    }

    pub async fn snapshot(&self) -> Option<RoundSnapshot> {
        let guard = self.inner.lock().await;
        guard.round.as_ref().map(|round| RoundSnapshot {
            message: round.message.clone(),
            resolution: round.handler.as_ref().and_then(VotingHandler::chosen_vote),
            advanced: round.advanced,
        })
    }

    /// Installs a previously captured round, replacing (and stopping) the current one.
    pub async fn restore_round(&self, snapshot: RoundSnapshot) {
        let mut guard = self.inner.lock().await;
        if let Some(handler) = guard.round.take().and_then(|round| round.handler) {
            handler.stop();
        }
        let handler = snapshot.resolution.map(|resolution| {
            VotingHandler::resolved(
                self.platform.bot_user_id(),
                Arc::clone(&self.config),
                resolution,
            )
        });
        guard.round = Some(Round {
            message: snapshot.message,
            handler,
            advanced: snapshot.advanced,
        });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
