use std::{collections::HashSet, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use gambit_types::{
    color::Color,
    game::PerfType,
    matchmaking::{Bot, MatchmakingType},
    Result,
};
use tracing::{debug, info, warn};

use crate::{matchmaking_error, store::OpponentStore, MatchmakingRecord};

/// Opponent and colour chosen for the next challenge.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub bot: Bot,
    pub color: Color,
}

/// Cooldown before a game pair against the same opponent may be repeated.
///
/// The played time is scaled against the estimate, a fixed delay is added and the
/// sum is multiplied by `multiplier`.
pub fn cooldown(
    game_duration: Duration,
    estimated_duration: Duration,
    delay: Duration,
    multiplier: u32,
) -> Duration {
    let played = if estimated_duration.is_zero() {
        game_duration
    } else {
        let ratio = game_duration.as_secs_f64() / estimated_duration.as_secs_f64();
        estimated_duration.mul_f64(ratio)
    };
    (played + delay).saturating_mul(multiplier)
}

fn add_std(time: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| time.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Picks opponents for self-initiated challenges and owns the opponent store.
pub struct OpponentScheduler {
    store: OpponentStore,
    delay: Duration,
    busy: HashSet<String>,
    last_opponent: Option<(Bot, Color)>,
}

impl OpponentScheduler {
    pub fn new(store: OpponentStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            busy: HashSet::new(),
            last_opponent: None,
        }
    }

    pub fn load(path: impl Into<PathBuf>, delay: Duration) -> Result<Self> {
        let store = OpponentStore::load(path)?;
        info!(
            opponents = store.opponents().len(),
            path = %store.path().display(),
            "Loaded matchmaking history"
        );
        Ok(Self::new(store, delay))
    }

    pub fn store(&self) -> &OpponentStore {
        &self.store
    }

    /// Writes the store now, e.g. after a manual reset.
    pub fn save(&self) -> Result<()> {
        self.store.save()
    }

    pub fn is_busy(&self, username: &str) -> bool {
        self.busy.contains(username)
    }

    pub fn next_opponent(&mut self, candidates: &[Bot], mm: &MatchmakingType) -> Option<Pairing> {
        self.next_opponent_at(candidates, mm, Utc::now())
    }

    /// Closest-rated eligible candidate. When nobody is eligible the category's
    /// cooldowns and the busy set are reset and the pool is scanned once more;
    /// `None` means the caller should poll again with a fresh pool.
    pub fn next_opponent_at(
        &mut self,
        candidates: &[Bot],
        mm: &MatchmakingType,
        now: DateTime<Utc>,
    ) -> Option<Pairing> {
        if let Some(pairing) = self.select(candidates, mm, now) {
            return Some(pairing);
        }
        info!(perf = %mm.perf_type, "Resetting matchmaking ...");
        self.reset_release_time_at(mm.perf_type, now);
        self.select(candidates, mm, now)
    }

    fn select(
        &mut self,
        candidates: &[Bot],
        mm: &MatchmakingType,
        now: DateTime<Utc>,
    ) -> Option<Pairing> {
        let mut pool: Vec<(&Bot, i32)> = candidates
            .iter()
            .filter_map(|bot| bot.rating_diff(mm.perf_type).map(|diff| (bot, diff)))
            .collect();
        pool.sort_by_key(|(_, diff)| diff.unsigned_abs());

        for (bot, diff) in pool {
            if mm.rated && bot.tos_violation {
                continue;
            }
            if !mm.accepts_rating_diff(diff) {
                continue;
            }
            if self.busy.contains(bot.key()) {
                continue;
            }

            let record = self
                .store
                .record(mm.perf_type, bot.key())
                .cloned()
                .unwrap_or_else(|| MatchmakingRecord::new(now));
            if record.next_color == Color::Black || record.release_time <= now {
                debug!(opponent = %bot.username, diff, color = %record.next_color, "opponent selected");
                self.last_opponent = Some((bot.clone(), record.next_color));
                return Some(Pairing {
                    bot: bot.clone(),
                    color: record.next_color,
                });
            }
        }
        None
    }

    pub fn add_timeout(
        &mut self,
        success: bool,
        game_duration: Duration,
        mm: &MatchmakingType,
    ) -> Result<()> {
        self.add_timeout_at(success, game_duration, mm, Utc::now())
    }

    /// Records the outcome of a game pair against the last selected opponent and
    /// persists the store.
    pub fn add_timeout_at(
        &mut self,
        success: bool,
        game_duration: Duration,
        mm: &MatchmakingType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (bot, color) = self
            .last_opponent
            .clone()
            .ok_or_else(|| matchmaking_error("no opponent has been selected"))?;
        let record = self.store.record_mut(mm.perf_type, bot.key(), now);

        if success && record.multiplier > 1 {
            record.multiplier /= 2;
        } else if !success {
            record.multiplier += 1;
        }

        let opponent_multiplier = if record.multiplier >= 5 {
            record.multiplier
        } else {
            1
        };
        let timeout = cooldown(
            game_duration,
            mm.estimated_game_duration(),
            self.delay,
            mm.multiplier.saturating_mul(opponent_multiplier),
        );
        let remaining = (record.release_time - now).to_std().unwrap_or_default();
        record.release_time = add_std(now, timeout.saturating_add(remaining));

        if success {
            record.next_color = color.opponent();
        }
        info!(
            opponent = %bot.username,
            perf = %mm.perf_type,
            "{} will not be challenged to a new game pair before {}.",
            bot.username,
            record.release_time.format("%Y-%m-%d %H:%M:%S")
        );

        self.busy.clear();
        if let Err(err) = self.store.save() {
            warn!(%err, "Saving the matchmaking file failed");
        }
        Ok(())
    }

    /// Marks the last selected opponent as busy until the next outcome or reset.
    pub fn skip_bot(&mut self) -> Result<()> {
        let (bot, _) = self
            .last_opponent
            .as_ref()
            .ok_or_else(|| matchmaking_error("no opponent has been selected"))?;
        debug!(opponent = %bot.username, "skipping busy opponent");
        self.busy.insert(bot.key().to_string());
        Ok(())
    }

    pub fn reset_release_time(&mut self, perf_type: PerfType) {
        self.reset_release_time_at(perf_type, Utc::now());
    }

    pub fn reset_release_time_at(&mut self, perf_type: PerfType, now: DateTime<Utc>) {
        self.store.reset_release_time(perf_type, now);
        self.busy.clear();
    }
}
