//! Opponent selection for self-initiated challenges, with persisted cooldowns.

mod matchmaker;
mod pool;
mod scheduler;
mod store;

pub use matchmaker::{ChallengeOutcome, Matchmaker};
pub use pool::{candidate_pool, own_ratings, OnlineBot, PerfRating};
pub use scheduler::{cooldown, OpponentScheduler, Pairing};
pub use store::{parse_release_time, MatchmakingRecord, Opponent, OpponentStore};

use gambit_types::GambitError;

pub fn matchmaking_error(message: impl Into<String>) -> GambitError {
    GambitError::Matchmaking(message.into())
}
