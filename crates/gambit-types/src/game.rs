use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    events::FullState,
    time_control::format_minutes,
};

/// Server-side game status as reported in every state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "aborted")]
    Aborted,
    #[serde(rename = "mate")]
    Mate,
    #[serde(rename = "resign")]
    Resign,
    #[serde(rename = "stalemate")]
    Stalemate,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "draw")]
    Draw,
    #[serde(rename = "outoftime")]
    OutOfTime,
    #[serde(rename = "cheat")]
    Cheat,
    #[serde(rename = "noStart")]
    NoStart,
    #[serde(rename = "variantEnd")]
    VariantEnd,
    #[serde(rename = "unknownFinish", other)]
    UnknownFinish,
}

impl GameStatus {
    pub fn is_running(self) -> bool {
        matches!(self, GameStatus::Created | GameStatus::Started)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    Standard,
    FromPosition,
    Antichess,
    Atomic,
    Chess960,
    Crazyhouse,
    Horde,
    KingOfTheHill,
    RacingKings,
    ThreeCheck,
}

impl Variant {
    /// Server key, as in the `variant.key` field of a game.
    pub fn key(self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::FromPosition => "fromPosition",
            Variant::Antichess => "antichess",
            Variant::Atomic => "atomic",
            Variant::Chess960 => "chess960",
            Variant::Crazyhouse => "crazyhouse",
            Variant::Horde => "horde",
            Variant::KingOfTheHill => "kingOfTheHill",
            Variant::RacingKings => "racingKings",
            Variant::ThreeCheck => "threeCheck",
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Standard
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Game-speed classification used to bucket ratings and matchmaking history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PerfType {
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Antichess,
    Atomic,
    Chess960,
    Crazyhouse,
    Horde,
    KingOfTheHill,
    RacingKings,
    ThreeCheck,
}

impl PerfType {
    pub const ALL: [PerfType; 12] = [
        PerfType::Bullet,
        PerfType::Blitz,
        PerfType::Rapid,
        PerfType::Classical,
        PerfType::Antichess,
        PerfType::Atomic,
        PerfType::Chess960,
        PerfType::Crazyhouse,
        PerfType::Horde,
        PerfType::KingOfTheHill,
        PerfType::RacingKings,
        PerfType::ThreeCheck,
    ];

    /// Key used by the server and the opponent store.
    pub fn key(self) -> &'static str {
        match self {
            PerfType::Bullet => "bullet",
            PerfType::Blitz => "blitz",
            PerfType::Rapid => "rapid",
            PerfType::Classical => "classical",
            PerfType::Antichess => "antichess",
            PerfType::Atomic => "atomic",
            PerfType::Chess960 => "chess960",
            PerfType::Crazyhouse => "crazyhouse",
            PerfType::Horde => "horde",
            PerfType::KingOfTheHill => "kingOfTheHill",
            PerfType::RacingKings => "racingKings",
            PerfType::ThreeCheck => "threeCheck",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|perf| perf.key() == key)
    }

    /// Categorises a time control. Non-standard variants are their own category.
    pub fn classify(variant: Variant, initial_secs: u64, increment_secs: u64) -> Self {
        match variant {
            Variant::Standard | Variant::FromPosition => {
                let estimated = initial_secs + increment_secs * 40;
                if estimated < 179 {
                    PerfType::Bullet
                } else if estimated < 479 {
                    PerfType::Blitz
                } else if estimated < 1499 {
                    PerfType::Rapid
                } else {
                    PerfType::Classical
                }
            }
            Variant::Antichess => PerfType::Antichess,
            Variant::Atomic => PerfType::Atomic,
            Variant::Chess960 => PerfType::Chess960,
            Variant::Crazyhouse => PerfType::Crazyhouse,
            Variant::Horde => PerfType::Horde,
            Variant::KingOfTheHill => PerfType::KingOfTheHill,
            Variant::RacingKings => PerfType::RacingKings,
            Variant::ThreeCheck => PerfType::ThreeCheck,
        }
    }
}

impl fmt::Display for PerfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn default_player_name() -> String {
    "AI".into()
}

/// One side of a game as announced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(default = "default_player_name")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<u32>,
    #[serde(default, rename = "aiLevel")]
    pub ai_level: Option<u8>,
    #[serde(default)]
    pub provisional: bool,
}

impl PlayerInfo {
    pub fn is_bot(&self) -> bool {
        self.title.as_deref() == Some("BOT")
    }

    /// Name prefixed with the title, e.g. `BOT Foo`.
    pub fn name_str(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => format!("{title} {}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for PlayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.rating, self.ai_level) {
            (Some(rating), _) => {
                let provisional = if self.provisional { "?" } else { "" };
                write!(f, "{} ({rating}{provisional})", self.name_str())
            }
            (None, Some(level)) => write!(f, "{} (Level {level})", self.name_str()),
            (None, None) => write!(f, "{}", self.name_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClockInfo {
    /// Initial time in milliseconds.
    pub initial: u64,
    /// Increment in milliseconds.
    pub increment: u64,
}

/// Incremental game state carried by `gameState` events and embedded in `gameFull`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub moves: String,
    #[serde(default)]
    pub wtime: u64,
    #[serde(default)]
    pub btime: u64,
    pub status: GameStatus,
    #[serde(default)]
    pub winner: Option<Color>,
}

impl GameState {
    pub fn ply(&self) -> usize {
        self.moves.split_whitespace().count()
    }
}

/// Immutable snapshot of a game, built once from a full-state event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: String,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub clock: ClockInfo,
    pub speed: String,
    pub rated: bool,
    pub variant: Variant,
    pub variant_name: String,
    pub initial_fen: String,
    pub is_white: bool,
    pub state: GameState,
}

impl GameInfo {
    pub fn from_full_state(full: &FullState, username: &str) -> Self {
        Self {
            id: full.id.clone(),
            white: full.white.clone(),
            black: full.black.clone(),
            clock: full.clock.unwrap_or_default(),
            speed: full.speed.clone(),
            rated: full.rated,
            variant: full.variant.key,
            variant_name: full.variant.name.clone(),
            initial_fen: full.initial_fen.clone(),
            is_white: full.white.name.eq_ignore_ascii_case(username),
            state: full.state.clone(),
        }
    }

    pub fn own_color(&self) -> Color {
        if self.is_white {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn player(&self, color: Color) -> &PlayerInfo {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn opponent(&self) -> &PlayerInfo {
        self.player(self.own_color().opponent())
    }

    pub fn opponent_is_bot(&self) -> bool {
        self.opponent().is_bot()
    }

    pub fn id_str(&self) -> String {
        format!("ID: {}", self.id)
    }

    pub fn tc_str(&self) -> String {
        let minutes = format_minutes(self.clock.initial as f64 / 60_000.0);
        format!("TC: {minutes}+{}", self.clock.increment / 1000)
    }

    pub fn rated_str(&self) -> &'static str {
        if self.rated {
            "Rated"
        } else {
            "Casual"
        }
    }

    pub fn variant_str(&self) -> String {
        format!("Variant: {}", self.variant_name)
    }

    /// One-line description printed when a game starts.
    pub fn header_line(&self) -> String {
        let players = format!("{}   -   {}", self.white, self.black);
        [
            self.id_str(),
            players,
            self.tc_str(),
            self.rated_str().to_string(),
            self.variant_str(),
        ]
        .join("     ")
    }
}
