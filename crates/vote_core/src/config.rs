use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEmoji {
    pub emoji: String,
    #[serde(rename = "move")]
    pub game_move: String,
}

/// What happens when a voter reacts with a second legal emoji in the same round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChangePolicy {
    /// The newest reaction replaces the voter's previous vote.
    #[default]
    LatestWins,
    /// The first vote stands until the voter removes that reaction.
    FirstWins,
}

/// How equal counts are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The emoji that reached the shared count earliest wins, then configuration order.
    #[default]
    FirstToReachCount,
    /// Configuration order only.
    ConfigOrder,
}

/// Validated, immutable controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    control_emojis: Vec<ControlEmoji>,
    vote_window: Duration,
    delete_previous_messages: bool,
    default_move: Option<String>,
    vote_change: VoteChangePolicy,
    tie_break: TieBreak,
}

impl ControllerConfig {
    pub fn new<I, E, M>(control_emojis: I, vote_window: Duration) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (E, M)>,
        E: Into<String>,
        M: Into<String>,
    {
        let control_emojis = control_emojis
            .into_iter()
            .map(|(emoji, game_move)| ControlEmoji {
                emoji: emoji.into(),
                game_move: game_move.into(),
            })
            .collect::<Vec<_>>();

        if control_emojis.is_empty() {
            return Err(ConfigError::NoControlEmojis);
        }

        let mut seen = HashSet::new();
        for (index, control) in control_emojis.iter().enumerate() {
            if control.emoji.trim().is_empty() {
                return Err(ConfigError::EmptyEmoji { index });
            }
            if control.game_move.trim().is_empty() {
                return Err(ConfigError::EmptyMove {
                    emoji: control.emoji.clone(),
                });
            }
            if !seen.insert(control.emoji.as_str()) {
                return Err(ConfigError::DuplicateEmoji {
                    emoji: control.emoji.clone(),
                });
            }
        }

        if vote_window.is_zero() {
            return Err(ConfigError::InvalidVoteWindow);
        }

        Ok(Self {
            control_emojis,
            vote_window,
            delete_previous_messages: false,
            default_move: None,
            vote_change: VoteChangePolicy::default(),
            tie_break: TieBreak::default(),
        })
    }

    pub fn with_delete_previous_messages(mut self, delete_previous_messages: bool) -> Self {
        self.delete_previous_messages = delete_previous_messages;
        self
    }

    pub fn with_default_move(
        mut self,
        default_move: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let default_move = default_move.into();
        if default_move.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultMove);
        }
        self.default_move = Some(default_move);
        Ok(self)
    }

    pub fn with_vote_change(mut self, vote_change: VoteChangePolicy) -> Self {
        self.vote_change = vote_change;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn control_emojis(&self) -> &[ControlEmoji] {
        &self.control_emojis
    }

    pub fn emojis(&self) -> impl Iterator<Item = &str> {
        self.control_emojis.iter().map(|control| control.emoji.as_str())
    }

    pub fn vote_window(&self) -> Duration {
        self.vote_window
    }

    pub fn delete_previous_messages(&self) -> bool {
        self.delete_previous_messages
    }

    pub fn default_move(&self) -> Option<&str> {
        self.default_move.as_deref()
    }

    pub fn vote_change(&self) -> VoteChangePolicy {
        self.vote_change
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_messages_and_count_latest_votes() {
        let config =
            ControllerConfig::new([("⬅️", "left"), ("➡️", "right")], Duration::from_secs(5))
                .expect("config");

        assert!(!config.delete_previous_messages());
        assert_eq!(config.default_move(), None);
        assert_eq!(config.vote_change(), VoteChangePolicy::LatestWins);
        assert_eq!(config.tie_break(), TieBreak::FirstToReachCount);
        assert_eq!(config.emojis().collect::<Vec<_>>(), vec!["⬅️", "➡️"]);
    }

    #[test]
    fn rejects_missing_or_malformed_mappings() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(
            ControllerConfig::new(empty, Duration::from_secs(5)),
            Err(ConfigError::NoControlEmojis)
        );
        assert_eq!(
            ControllerConfig::new([("⬅️", "left"), (" ", "right")], Duration::from_secs(5)),
            Err(ConfigError::EmptyEmoji { index: 1 })
        );
        assert_eq!(
            ControllerConfig::new([("⬅️", "")], Duration::from_secs(5)),
            Err(ConfigError::EmptyMove {
                emoji: "⬅️".into()
            })
        );
        assert_eq!(
            ControllerConfig::new([("⬅️", "left"), ("⬅️", "right")], Duration::from_secs(5)),
            Err(ConfigError::DuplicateEmoji {
                emoji: "⬅️".into()
            })
        );
    }

    #[test]
    fn rejects_zero_vote_window() {
        assert_eq!(
            ControllerConfig::new([("⬅️", "left")], Duration::ZERO),
            Err(ConfigError::InvalidVoteWindow)
        );
    }

    #[test]
    fn default_move_must_not_be_blank() {
        let config =
            ControllerConfig::new([("⬅️", "left")], Duration::from_secs(1)).expect("config");
        assert_eq!(
            config.clone().with_default_move("  "),
            Err(ConfigError::EmptyDefaultMove)
        );
        let config = config.with_default_move("wait").expect("default move");
        assert_eq!(config.default_move(), Some("wait"));
    }
}
