use std::collections::HashMap;

use gambit_types::{game::PerfType, matchmaking::Bot};
use serde::{Deserialize, Serialize};

const DEFAULT_OPPONENT_RATING: i32 = 1500;
const DEFAULT_OWN_RATING: i32 = 2500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfRating {
    pub rating: i32,
}

/// One entry of the server's online-bot listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineBot {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, rename = "tosViolation")]
    pub tos_violation: bool,
    #[serde(default)]
    pub perfs: HashMap<String, PerfRating>,
}

/// Our own rating per category, from the account's `perfs` object.
pub fn own_ratings(
    perfs: &HashMap<String, PerfRating>,
    perf_types: &[PerfType],
) -> HashMap<PerfType, i32> {
    perf_types
        .iter()
        .map(|perf| {
            let rating = perfs
                .get(perf.key())
                .map_or(DEFAULT_OWN_RATING, |entry| entry.rating);
            (*perf, rating)
        })
        .collect()
}

/// Turns the online-bot listing into scheduler candidates.
///
/// Ourselves, blacklisted and disabled accounts are dropped, as are accounts with a
/// fair-play flag when `rated` play is sought.
pub fn candidate_pool(
    online: &[OnlineBot],
    own_ratings: &HashMap<PerfType, i32>,
    username: &str,
    blacklist: &[String],
    rated: bool,
) -> Vec<Bot> {
    online
        .iter()
        .filter(|bot| !bot.username.eq_ignore_ascii_case(username))
        .filter(|bot| !blacklist.iter().any(|id| id.eq_ignore_ascii_case(&bot.id)))
        .filter(|bot| !bot.disabled && !(rated && bot.tos_violation))
        .map(|online_bot| {
            let mut bot = Bot::new(online_bot.username.clone());
            bot.tos_violation = online_bot.tos_violation;
            for (perf, own) in own_ratings {
                let rating = online_bot
                    .perfs
                    .get(perf.key())
                    .map_or(DEFAULT_OPPONENT_RATING, |entry| entry.rating);
                bot.rating_diffs.insert(*perf, rating - own);
            }
            bot
        })
        .collect()
}
