//! Classification of finished games into the human-readable result line.

use gambit_engine::DrawReason;
use gambit_types::{
    color::Color,
    game::{GameInfo, GameStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCause {
    Checkmate,
    /// Flag fall.
    Timeout,
    Resignation,
    VariantEnd,
    /// The loser left and the winner claimed the game.
    Abandonment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawCause {
    FiftyMoves,
    Repetition,
    InsufficientMaterial,
    VariantDraw,
    Stalemate,
    Agreement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Decisive { winner: Color, cause: WinCause },
    Draw(DrawCause),
    Aborted,
}

impl GameResult {
    pub fn classify(
        winner: Option<Color>,
        status: GameStatus,
        draw_reason: Option<DrawReason>,
    ) -> Self {
        if let Some(winner) = winner {
            let cause = match status {
                GameStatus::Mate => WinCause::Checkmate,
                GameStatus::OutOfTime => WinCause::Timeout,
                GameStatus::Resign => WinCause::Resignation,
                GameStatus::VariantEnd => WinCause::VariantEnd,
                GameStatus::Timeout => WinCause::Abandonment,
                _ => WinCause::Other,
            };
            return GameResult::Decisive { winner, cause };
        }

        match status {
            GameStatus::Draw => GameResult::Draw(match draw_reason {
                Some(DrawReason::FiftyMoves) => DrawCause::FiftyMoves,
                Some(DrawReason::Repetition) => DrawCause::Repetition,
                Some(DrawReason::InsufficientMaterial) => DrawCause::InsufficientMaterial,
                Some(DrawReason::VariantDraw) => DrawCause::VariantDraw,
                None => DrawCause::Agreement,
            }),
            GameStatus::Stalemate => GameResult::Draw(DrawCause::Stalemate),
            _ => GameResult::Aborted,
        }
    }

    /// White and black score strings.
    pub fn score(&self) -> (&'static str, &'static str) {
        match self {
            GameResult::Decisive {
                winner: Color::White,
                ..
            } => ("1", "0"),
            GameResult::Decisive {
                winner: Color::Black,
                ..
            } => ("0", "1"),
            GameResult::Draw(_) => ("½", "½"),
            GameResult::Aborted => ("X", "X"),
        }
    }

    pub fn message(&self, info: &GameInfo) -> String {
        match *self {
            GameResult::Decisive { winner, cause } => {
                let won = format!("{} won", info.player(winner).name_str());
                let loser = info.player(winner.opponent()).name_str();
                match cause {
                    WinCause::Checkmate => format!("{won} by checkmate!"),
                    WinCause::Timeout => format!("{won}! {loser} ran out of time."),
                    WinCause::Resignation => format!("{won}! {loser} resigned."),
                    WinCause::VariantEnd => format!("{won} by variant rules!"),
                    WinCause::Abandonment => format!("{won}! {loser} left the game."),
                    WinCause::Other => format!("{won}."),
                }
            }
            GameResult::Draw(cause) => match cause {
                DrawCause::FiftyMoves => "Game drawn by 50-move rule.".into(),
                DrawCause::Repetition => "Game drawn by threefold repetition.".into(),
                DrawCause::InsufficientMaterial => {
                    "Game drawn due to insufficient material.".into()
                }
                DrawCause::VariantDraw => "Game drawn by variant rules.".into(),
                DrawCause::Stalemate => "Game drawn by stalemate.".into(),
                DrawCause::Agreement => "Game drawn by agreement.".into(),
            },
            GameResult::Aborted => "Game aborted.".into(),
        }
    }

    /// `ID: <id>     <white> 1 - 0 <black>     <message>`
    pub fn summary_line(&self, info: &GameInfo) -> String {
        let (white_score, black_score) = self.score();
        let players = format!("{} {white_score} - {black_score} {}", info.white, info.black);
        [info.id_str(), players, self.message(info)].join("     ")
    }
}
