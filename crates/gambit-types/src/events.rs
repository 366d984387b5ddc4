use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::{ClockInfo, GameState, PlayerInfo, Variant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantInfo {
    pub key: Variant,
    pub name: String,
}

fn default_initial_fen() -> String {
    "startpos".into()
}

/// Payload of a `gameFull` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullState {
    pub id: String,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    #[serde(default)]
    pub clock: Option<ClockInfo>,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub rated: bool,
    pub variant: VariantInfo,
    #[serde(default = "default_initial_fen", rename = "initialFen")]
    pub initial_fen: String,
    pub state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
    pub room: String,
}

/// One message of a per-game event stream, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    FullState(Box<FullState>),
    StateUpdate(GameState),
    ChatLine(ChatLine),
    OpponentGone {
        gone: bool,
        claim_win_in_seconds: Option<u64>,
    },
    Keepalive,
    Unknown(Value),
}

impl GameEvent {
    /// Decodes one line of the newline-delimited stream. Blank lines are keep-alives.
    pub fn from_line(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return GameEvent::Keepalive;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_value(value),
            Err(_) => GameEvent::Unknown(Value::String(trimmed.to_string())),
        }
    }

    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let decoded = match kind.as_str() {
            "gameFull" => serde_json::from_value::<FullState>(value.clone())
                .map(|full| GameEvent::FullState(Box::new(full))),
            "gameState" => {
                serde_json::from_value::<GameState>(value.clone()).map(GameEvent::StateUpdate)
            }
            "chatLine" => serde_json::from_value::<ChatLine>(value.clone()).map(GameEvent::ChatLine),
            "opponentGone" => Ok(GameEvent::OpponentGone {
                gone: value.get("gone").and_then(Value::as_bool).unwrap_or(false),
                claim_win_in_seconds: value.get("claimWinInSeconds").and_then(Value::as_u64),
            }),
            "ping" => Ok(GameEvent::Keepalive),
            _ => return GameEvent::Unknown(value),
        };
        decoded.unwrap_or(GameEvent::Unknown(value))
    }

    /// Short tag used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            GameEvent::FullState(_) => "gameFull",
            GameEvent::StateUpdate(_) => "gameState",
            GameEvent::ChatLine(_) => "chatLine",
            GameEvent::OpponentGone { .. } => "opponentGone",
            GameEvent::Keepalive => "keepalive",
            GameEvent::Unknown(_) => "unknown",
        }
    }

    /// Full or partial game-state updates; every other event is ancillary.
    pub fn is_state(&self) -> bool {
        matches!(self, GameEvent::FullState(_) | GameEvent::StateUpdate(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{color::Color, game::GameStatus};

    #[test]
    fn blank_line_is_keepalive() {
        assert_eq!(GameEvent::from_line(""), GameEvent::Keepalive);
        assert_eq!(GameEvent::from_line("  \r"), GameEvent::Keepalive);
    }

    #[test]
    fn decodes_state_update_with_winner() {
        let event = GameEvent::from_line(
            r#"{"type":"gameState","moves":"e2e4 e7e5","wtime":1000,"btime":900,"status":"mate","winner":"white"}"#,
        );
        match event {
            GameEvent::StateUpdate(state) => {
                assert_eq!(state.ply(), 2);
                assert_eq!(state.status, GameStatus::Mate);
                assert_eq!(state.winner, Some(Color::White));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn decodes_chat_and_opponent_gone() {
        let chat = GameEvent::from_line(
            r#"{"type":"chatLine","username":"rival","text":"hi","room":"player"}"#,
        );
        assert_eq!(chat.tag(), "chatLine");
        assert!(!chat.is_state());

        let gone = GameEvent::from_line(r#"{"type":"opponentGone","gone":true,"claimWinInSeconds":10}"#);
        assert_eq!(
            gone,
            GameEvent::OpponentGone {
                gone: true,
                claim_win_in_seconds: Some(10)
            }
        );
    }

    #[test]
    fn malformed_lines_become_unknown() {
        assert!(matches!(GameEvent::from_line("{not json"), GameEvent::Unknown(_)));
        assert!(matches!(
            GameEvent::from_line(r#"{"type":"gameState","status":17}"#),
            GameEvent::Unknown(_)
        ));
        assert!(matches!(
            GameEvent::from_line(r#"{"type":"somethingElse"}"#),
            GameEvent::Unknown(_)
        ));
    }
}
