mod config;
mod controller;
mod engine;
pub mod error;
mod tally;
mod voting_handler;

pub use config::{ControlEmoji, ControllerConfig, TieBreak, VoteChangePolicy};
pub use controller::{GameController, RoundSnapshot};
pub use engine::{GameEngine, GameFactory};
pub use error::{ConfigError, ControllerError, VotingError};
pub use tally::{Resolution, TallyWinner, Vote, VoteTally};
pub use voting_handler::{HandlerPhase, OnResolved, VotingHandler};
