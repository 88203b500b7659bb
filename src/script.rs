//! Replay scripts for the command-line player.
//!
//! A script is a list of tokens separated by whitespace or `;`:
//!
//! - `x,y>x,y` moves whatever stands at the first cell to the second
//! - `|` seals the current turn (checkpoint)
//! - `undo` undoes one turn
//! - `undo:N` undoes `N` turns at once

use crate::entity::Position;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move { from: Position, to: Position },
    Checkpoint,
    Undo,
    Rewind(usize),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { from, to } => write!(f, "{},{}>{},{}", from.x, from.y, to.x, to.y),
            Command::Checkpoint => write!(f, "|"),
            Command::Undo => write!(f, "undo"),
            Command::Rewind(steps) => write!(f, "undo:{}", steps),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("invalid token '{token}' at index {index}")]
    InvalidToken { index: usize, token: String },
}

pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    text.split(|c: char| c.is_whitespace() || c == ';')
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            parse_command(token).ok_or_else(|| ScriptError::InvalidToken {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_command(token: &str) -> Option<Command> {
    match token {
        "|" => return Some(Command::Checkpoint),
        "undo" => return Some(Command::Undo),
        _ => {}
    }
    if let Some(steps) = token.strip_prefix("undo:") {
        return steps.parse().ok().map(Command::Rewind);
    }
    let (from, to) = token.split_once('>')?;
    Some(Command::Move {
        from: parse_position(from)?,
        to: parse_position(to)?,
    })
}

fn parse_position(text: &str) -> Option<Position> {
    let (x, y) = text.split_once(',')?;
    Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let commands = parse_script("2,1>3,1 1,1>2,1 |\n undo;undo:2").unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Move {
                    from: Position::new(2, 1),
                    to: Position::new(3, 1),
                },
                Command::Move {
                    from: Position::new(1, 1),
                    to: Position::new(2, 1),
                },
                Command::Checkpoint,
                Command::Undo,
                Command::Rewind(2),
            ]
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_script("  ;; \n").unwrap(), vec![]);
    }

    #[test]
    fn test_invalid_tokens() {
        for (script, bad) in [
            ("| 1,1>2", "1,1>2"),
            ("undo:x", "undo:x"),
            ("redo", "redo"),
            ("-1,0>0,0", "-1,0>0,0"),
        ] {
            assert_eq!(
                parse_script(script).unwrap_err(),
                ScriptError::InvalidToken {
                    index: if script.starts_with('|') { 1 } else { 0 },
                    token: bad.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_display_round_trip() {
        let text = "0,0>1,0 | undo undo:3";
        let rendered: Vec<String> = parse_script(text)
            .unwrap()
            .iter()
            .map(Command::to_string)
            .collect();
        assert_eq!(rendered.join(" "), text);
    }
}
