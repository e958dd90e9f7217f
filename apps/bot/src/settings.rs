use std::{path::Path, time::Duration};

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use vote_core::{ConfigError, ControlEmoji, ControllerConfig, TieBreak, VoteChangePolicy};

const ENV_PREFIX: &str = "APP";
const DEFAULT_CONFIG_NAME: &str = "bot";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MazeSettings {
    pub max_turns: u32,
}

impl Default for MazeSettings {
    fn default() -> Self {
        Self { max_turns: 40 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub bot_user_id: i64,
    pub channel_id: i64,
    pub vote_timer_secs: u64,
    pub delete_previous_messages: bool,
    pub default_move: Option<String>,
    pub vote_change: VoteChangePolicy,
    pub tie_break: TieBreak,
    pub control_emojis: Vec<ControlEmoji>,
    pub maze: MazeSettings,
}

impl Default for BotSettings {
    fn default() -> Self {
        let control = |emoji: &str, game_move: &str| ControlEmoji {
            emoji: emoji.into(),
            game_move: game_move.into(),
        };
        Self {
            bot_user_id: 900_000,
            channel_id: 1,
            vote_timer_secs: 10,
            delete_previous_messages: false,
            default_move: None,
            vote_change: VoteChangePolicy::default(),
            tie_break: TieBreak::default(),
            control_emojis: vec![
                control("⬆️", "up"),
                control("⬇️", "down"),
                control("⬅️", "left"),
                control("➡️", "right"),
            ],
            maze: MazeSettings::default(),
        }
    }
}

impl BotSettings {
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let mut config = ControllerConfig::new(
            self.control_emojis
                .iter()
                .map(|control| (control.emoji.clone(), control.game_move.clone())),
            Duration::from_secs(self.vote_timer_secs),
        )?
        .with_delete_previous_messages(self.delete_previous_messages)
        .with_vote_change(self.vote_change)
        .with_tie_break(self.tie_break);

        if let Some(default_move) = &self.default_move {
            config = config.with_default_move(default_move.clone())?;
        }
        Ok(config)
    }
}

/// Loads `path` (or an optional `bot.toml` in the working directory) and overlays
/// `APP__*` environment variables, e.g. `APP__VOTE_TIMER_SECS=5`.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<BotSettings> {
    load_settings_with_prefix(path, ENV_PREFIX)
}

fn load_settings_with_prefix(path: Option<&Path>, env_prefix: &str) -> anyhow::Result<BotSettings> {
    let file = match path {
        Some(path) => File::from(path),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(Config::try_deserialize::<BotSettings>)
        .with_context(|| match path {
            Some(path) => format!("failed to load settings from '{}'", path.display()),
            None => "failed to load settings".to_string(),
        })
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
