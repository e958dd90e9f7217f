use shared::domain::MessageId;
use thiserror::Error;

use crate::voting_handler::HandlerPhase;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one control emoji is required")]
    NoControlEmojis,
    #[error("control emoji at position {index} is empty")]
    EmptyEmoji { index: usize },
    #[error("control emoji {emoji} maps to an empty move")]
    EmptyMove { emoji: String },
    #[error("control emoji {emoji} is configured more than once")]
    DuplicateEmoji { emoji: String },
    #[error("vote window must be longer than zero")]
    InvalidVoteWindow,
    #[error("default move must not be empty")]
    EmptyDefaultMove,
}

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("voting handler cannot start collecting from phase {0:?}")]
    NotIdle(HandlerPhase),
    #[error("failed to register reaction listener: {0:#}")]
    ListenerRegistration(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Voting(#[from] VotingError),
    #[error("game moved {game_move} but replying to message {message_id} failed: {source:#}")]
    Reply {
        message_id: MessageId,
        game_move: String,
        source: anyhow::Error,
    },
}
