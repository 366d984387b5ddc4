//! Move broker abstraction: the component that owns the board, the clocks and the engine.

use async_trait::async_trait;
use gambit_types::{
    game::{GameInfo, GameState, GameStatus},
    GambitError, Result,
};
use serde::{Deserialize, Serialize};

/// What the broker decided for the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDecision {
    /// Move in UCI notation.
    pub uci_move: String,
    pub offer_draw: bool,
    pub resign: bool,
}

impl MoveDecision {
    pub fn play(uci_move: impl Into<String>) -> Self {
        Self {
            uci_move: uci_move.into(),
            offer_draw: false,
            resign: false,
        }
    }
}

/// Board-level reason a drawn game ended, as judged by the rules library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawReason {
    FiftyMoves,
    Repetition,
    InsufficientMaterial,
    VariantDraw,
}

#[async_trait]
pub trait MoveBroker: Send {
    /// Applies a state update. Returns `true` when the position changed.
    async fn update(&mut self, state: &GameState) -> Result<bool>;
    async fn make_move(&mut self) -> Result<MoveDecision>;
    async fn start_pondering(&mut self) -> Result<()>;
    /// Releases engine processes and other per-game resources.
    async fn end_game(&mut self) -> Result<()>;

    fn is_our_turn(&self) -> bool;
    /// Server status is no longer running.
    fn is_finished(&self) -> bool;
    /// The board itself is terminal (mate, stalemate, draw rule) even if the server has not said so yet.
    fn is_game_over(&self) -> bool;
    /// No irreversible move has been played by either side.
    fn is_abortable(&self) -> bool;
    fn status(&self) -> GameStatus;
    fn draw_reason(&self) -> Option<DrawReason>;
}

/// Creates a broker for a freshly started game.
#[async_trait]
pub trait BrokerFactory: Send + Sync {
    type Broker: MoveBroker;

    async fn create(&self, info: &GameInfo) -> Result<Self::Broker>;
}

pub fn engine_error(message: impl Into<String>) -> GambitError {
    GambitError::Engine(message.into())
}
