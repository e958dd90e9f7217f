use shared::domain::UserId;
use thiserror::Error;

pub const USAGE: &str =
    "commands: <user-id> <emoji> | -<user-id> <emoji> | stop | restart | resume | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    React { user_id: UserId, emoji: String },
    Unreact { user_id: UserId, emoji: String },
    StopVoting,
    Restart,
    Resume,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("invalid user id '{0}'")]
    InvalidUser(String),
    #[error("missing emoji after user id {0}")]
    MissingEmoji(i64),
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, ParseError> {
    let mut tokens = line.split_whitespace();
    let head = tokens.next().ok_or(ParseError::Empty)?;

    let command = match head.to_ascii_lowercase().as_str() {
        "stop" => ConsoleCommand::StopVoting,
        "restart" => ConsoleCommand::Restart,
        "resume" => ConsoleCommand::Resume,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => {
            let (removing, user) = match head.strip_prefix('-') {
                Some(user) => (true, user),
                None => (false, head),
            };
            if !user.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(ParseError::Unknown(head.to_string()));
            }
            let user_id = user
                .parse::<i64>()
                .map(UserId)
                .map_err(|_| ParseError::InvalidUser(user.to_string()))?;
            let emoji = tokens
                .next()
                .ok_or(ParseError::MissingEmoji(user_id.0))?
                .to_string();
            if removing {
                ConsoleCommand::Unreact { user_id, emoji }
            } else {
                ConsoleCommand::React { user_id, emoji }
            }
        }
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reactions_and_removals() {
        assert_eq!(
            parse_command("12 ⬅️"),
            Ok(ConsoleCommand::React {
                user_id: UserId(12),
                emoji: "⬅️".into()
            })
        );
        assert_eq!(
            parse_command("  -12   ⬅️ "),
            Ok(ConsoleCommand::Unreact {
                user_id: UserId(12),
                emoji: "⬅️".into()
            })
        );
    }

    #[test]
    fn parses_keywords_case_insensitively() {
        assert_eq!(parse_command("STOP"), Ok(ConsoleCommand::StopVoting));
        assert_eq!(parse_command("restart"), Ok(ConsoleCommand::Restart));
        assert_eq!(parse_command("Resume"), Ok(ConsoleCommand::Resume));
        assert_eq!(parse_command("exit"), Ok(ConsoleCommand::Quit));
        assert_eq!(parse_command("?"), Ok(ConsoleCommand::Help));
    }

    #[test]
    fn reports_malformed_input() {
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_command("dance"),
            Err(ParseError::Unknown("dance".into()))
        );
        assert_eq!(
            parse_command("12x ⬅️"),
            Err(ParseError::InvalidUser("12x".into()))
        );
        assert_eq!(parse_command("-4"), Err(ParseError::MissingEmoji(4)));
    }
}
