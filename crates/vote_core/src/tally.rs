use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::UserId;
use tracing::debug;

use crate::config::{ControlEmoji, ControllerConfig, TieBreak, VoteChangePolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub voter: UserId,
    pub emoji: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyWinner {
    pub emoji: String,
    pub game_move: String,
    pub votes: usize,
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Voted {
        emoji: String,
        game_move: String,
        votes: usize,
    },
    /// Nobody voted and a default move is configured.
    Fallback { game_move: String },
    NoVotes,
}

impl Resolution {
    pub(crate) fn from_tally(winner: Option<TallyWinner>, default_move: Option<&str>) -> Self {
        match (winner, default_move) {
            (Some(winner), _) => Resolution::Voted {
                emoji: winner.emoji,
                game_move: winner.game_move,
                votes: winner.votes,
            },
            (None, Some(game_move)) => Resolution::Fallback {
                game_move: game_move.to_string(),
            },
            (None, None) => Resolution::NoVotes,
        }
    }

    pub fn game_move(&self) -> Option<&str> {
        match self {
            Resolution::Voted { game_move, .. } | Resolution::Fallback { game_move } => {
                Some(game_move)
            }
            Resolution::NoVotes => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.game_move() {
            Some(game_move) => f.write_str(game_move),
            None => f.write_str("<no votes>"),
        }
    }
}

/// Per-round vote accumulator.
///
/// Each option keeps the sequence numbers at which it reached every count it
/// currently holds, so "who reached the current count first" survives retractions.
pub struct VoteTally {
    options: Vec<ControlEmoji>,
    bot_user_id: UserId,
    vote_change: VoteChangePolicy,
    tie_break: TieBreak,
    votes: HashMap<UserId, Vote>,
    reached_at: Vec<Vec<u64>>,
    next_seq: u64,
}

impl VoteTally {
    pub fn new(bot_user_id: UserId, config: &ControllerConfig) -> Self {
        let options = config.control_emojis().to_vec();
        let reached_at = vec![Vec::new(); options.len()];
        Self {
            options,
            bot_user_id,
            vote_change: config.vote_change(),
            tie_break: config.tie_break(),
            votes: HashMap::new(),
            reached_at,
            next_seq: 0,
        }
    }

    fn position(&self, emoji: &str) -> Option<usize> {
        self.options.iter().position(|option| option.emoji == emoji)
    }

    /// Counts a reaction. Unknown emojis and the bot's own reactions are dropped.
    /// Returns whether the tally changed.
    pub fn record(&mut self, voter: UserId, emoji: &str) -> bool {
        if voter == self.bot_user_id {
            return false;
        }
        let Some(index) = self.position(emoji) else {
            debug!(voter = voter.0, emoji, "vote: ignoring reaction outside the legal set");
            return false;
        };

        let previous = self.votes.get(&voter).map(|vote| vote.emoji.clone());
        if let Some(previous) = previous {
            if previous == emoji {
                return false;
            }
            match self.vote_change {
                VoteChangePolicy::FirstWins => return false,
                VoteChangePolicy::LatestWins => {
                    if let Some(previous_index) = self.position(&previous) {
                        self.reached_at[previous_index].pop();
                    }
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.reached_at[index].push(seq);
        self.votes.insert(
            voter,
            Vote {
                voter,
                emoji: emoji.to_string(),
                recorded_at: Utc::now(),
            },
        );
        true
    }

    /// Withdraws `voter`'s vote if it is currently on `emoji`.
    pub fn retract(&mut self, voter: UserId, emoji: &str) -> bool {
        match self.votes.get(&voter) {
            Some(vote) if vote.emoji == emoji => {}
            _ => return false,
        }
        self.votes.remove(&voter);
        if let Some(index) = self.position(emoji) {
            self.reached_at[index].pop();
        }
        true
    }

    pub fn counts(&self) -> Vec<(&str, usize)> {
        self.options
            .iter()
            .zip(&self.reached_at)
            .map(|(option, reached)| (option.emoji.as_str(), reached.len()))
            .collect()
    }

    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }

    pub fn vote_of(&self, voter: UserId) -> Option<&Vote> {
        self.votes.get(&voter)
    }

    /// Highest count wins; `None` when nobody voted.
    pub fn resolve(&self) -> Option<TallyWinner> {
        let max = self.reached_at.iter().map(Vec::len).max().unwrap_or(0);
        if max == 0 {
            return None;
        }

        let mut leaders =
            (0..self.options.len()).filter(|&index| self.reached_at[index].len() == max);
        let index = match self.tie_break {
            TieBreak::ConfigOrder => leaders.next(),
            TieBreak::FirstToReachCount => {
                leaders.min_by_key(|&index| (self.reached_at[index][max - 1], index))
            }
        }?;

        let option = &self.options[index];
        Some(TallyWinner {
            emoji: option.emoji.clone(),
            game_move: option.game_move.clone(),
            votes: max,
        })
    }
}
