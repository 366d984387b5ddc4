use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use gambit_session::SessionReport;
use gambit_types::{
    config::GambitConfig,
    matchmaking::{Bot, MatchmakingType},
    Result,
};
use tracing::{debug, info};

use crate::{
    pool::{candidate_pool, own_ratings, OnlineBot, PerfRating},
    scheduler::{OpponentScheduler, Pairing},
};

/// Final state of a challenge we sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Accepted,
    /// Declined, timed out or otherwise refused by the opponent.
    Declined,
    RateLimited,
    /// The server rejected the challenge parameters.
    Misconfigured,
}

/// Glues the scheduler to challenge and game results.
pub struct Matchmaker {
    username: String,
    blacklist: Vec<String>,
    scheduler: OpponentScheduler,
}

impl Matchmaker {
    pub fn new(config: &GambitConfig, scheduler: OpponentScheduler) -> Self {
        Self {
            username: config.username.clone(),
            blacklist: config.matchmaking.blacklist.clone(),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &OpponentScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut OpponentScheduler {
        &mut self.scheduler
    }

    /// Challengeable bots for `mm`, without ourselves and blacklisted accounts.
    pub fn candidates(
        &self,
        online: &[OnlineBot],
        account_perfs: &HashMap<String, PerfRating>,
        mm: &MatchmakingType,
    ) -> Vec<Bot> {
        let ratings = own_ratings(account_perfs, &[mm.perf_type]);
        candidate_pool(online, &ratings, &self.username, &self.blacklist, mm.rated)
    }

    /// Next opponent that is not currently playing. Busy picks are skipped; gives up
    /// after one attempt per candidate.
    pub fn next_challenge<P>(
        &mut self,
        candidates: &[Bot],
        mm: &MatchmakingType,
        now: DateTime<Utc>,
        mut is_busy: P,
    ) -> Option<Pairing>
    where
        P: FnMut(&Bot) -> bool,
    {
        let mut pairing = self.scheduler.next_opponent_at(candidates, mm, now)?;
        for _ in 0..candidates.len() {
            if !is_busy(&pairing.bot) {
                info!(
                    opponent = %pairing.bot.username,
                    color = %pairing.color,
                    perf = %mm.perf_type,
                    "Challenging {} as {} to {}...",
                    pairing.bot.username,
                    pairing.color,
                    mm.perf_type
                );
                return Some(pairing);
            }
            info!(
                opponent = %pairing.bot.username,
                "Skipping {} as {} because it is playing a game...",
                pairing.bot.username,
                pairing.color
            );
            self.scheduler.skip_bot().ok()?;
            pairing = self.scheduler.next_opponent_at(candidates, mm, now)?;
        }
        debug!(perf = %mm.perf_type, "every candidate is busy");
        None
    }

    /// Refused challenges count as a failed pair of estimated length. Rate limits and
    /// bad parameters say nothing about the opponent and leave its record alone.
    pub fn on_challenge_outcome(
        &mut self,
        outcome: ChallengeOutcome,
        mm: &MatchmakingType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match outcome {
            ChallengeOutcome::Declined => {
                self.scheduler
                    .add_timeout_at(false, mm.estimated_game_duration(), mm, now)
            }
            ChallengeOutcome::Accepted
            | ChallengeOutcome::RateLimited
            | ChallengeOutcome::Misconfigured => Ok(()),
        }
    }

    /// A played game is a success; an aborted one is a failure charged with the
    /// estimated game length on top of the time spent.
    pub fn on_game_finished(
        &mut self,
        report: &SessionReport,
        mm: &MatchmakingType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut game_duration = report
            .started_at
            .and_then(|started_at| (now - started_at).to_std().ok())
            .unwrap_or(Duration::ZERO);
        if report.was_aborted {
            game_duration += mm.estimated_game_duration();
        }
        debug!(
            game_id = %report.game_id,
            aborted = report.was_aborted,
            secs = game_duration.as_secs(),
            "recording game outcome"
        );
        self.scheduler
            .add_timeout_at(!report.was_aborted, game_duration, mm, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cooldown, store::OpponentStore};
    use gambit_types::{
        color::Color,
        config::{MatchmakingConfig, MatchmakingTypeConfig},
        game::{PerfType, Variant},
    };

    fn blitz() -> MatchmakingType {
        MatchmakingType::from_config(&MatchmakingTypeConfig {
            name: "blitz".into(),
            initial_time: 180,
            increment: 2,
            rated: false,
            variant: Variant::Standard,
            multiplier: 15,
            min_rating_diff: 0,
            max_rating_diff: None,
        })
    }

    fn matchmaker(name: &str) -> Matchmaker {
        let path = std::env::temp_dir().join(format!("gambit-matchmaker-{name}.json"));
        let _ = std::fs::remove_file(&path);
        let config = GambitConfig {
            username: "GambitBot".into(),
            ops: Default::default(),
            session: Default::default(),
            matchmaking: MatchmakingConfig {
                blacklist: vec!["spammer".into()],
                ..MatchmakingConfig::default()
            },
        };
        let scheduler = OpponentScheduler::new(OpponentStore::empty(path), Duration::from_secs(10));
        Matchmaker::new(&config, scheduler)
    }

    fn report(started_at: Option<DateTime<Utc>>, was_aborted: bool) -> SessionReport {
        SessionReport {
            game_id: "g4m3id01".into(),
            result: None,
            summary: None,
            started_at,
            was_aborted,
        }
    }

    fn bot(name: &str, diff: i32) -> Bot {
        Bot::new(name).with_rating_diff(PerfType::Blitz, diff)
    }

    fn cleanup(matchmaker: &Matchmaker) {
        let _ = std::fs::remove_file(matchmaker.scheduler().store().path());
    }

    #[test]
    fn candidates_skip_ourselves_and_blacklisted_ids() {
        let matchmaker = matchmaker("candidates");
        let online: Vec<OnlineBot> = serde_json::from_str(
            r#"[
                {"id": "gambitbot", "username": "GambitBot"},
                {"id": "spammer", "username": "Spammer"},
                {"id": "rival", "username": "Rival", "perfs": {"blitz": {"rating": 2600}}}
            ]"#,
        )
        .expect("parse listing");

        let pool = matchmaker.candidates(&online, &HashMap::new(), &blitz());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].username, "Rival");
        assert_eq!(pool[0].rating_diff(PerfType::Blitz), Some(100));
    }

    #[test]
    fn busy_opponents_are_skipped() {
        let mm = blitz();
        let now = Utc::now();
        let mut matchmaker = matchmaker("busy");
        let pool = vec![bot("A", 10), bot("B", 20)];

        let pairing = matchmaker
            .next_challenge(&pool, &mm, now, |bot| bot.username == "A")
            .expect("pairing");
        assert_eq!(pairing.bot.username, "B");
        assert!(matchmaker.scheduler().is_busy("A"));

        assert!(matchmaker.next_challenge(&pool, &mm, now, |_| true).is_none());
    }

    #[test]
    fn declined_challenge_is_a_failed_pair() {
        let mm = blitz();
        let now = Utc::now();
        let mut matchmaker = matchmaker("declined");
        matchmaker
            .next_challenge(&[bot("A", 10)], &mm, now, |_| false)
            .expect("pairing");

        matchmaker
            .on_challenge_outcome(ChallengeOutcome::RateLimited, &mm, now)
            .expect("rate limited");
        assert!(matchmaker.scheduler().store().record(PerfType::Blitz, "A").is_none());

        matchmaker
            .on_challenge_outcome(ChallengeOutcome::Declined, &mm, now)
            .expect("declined");
        let record = matchmaker
            .scheduler()
            .store()
            .record(PerfType::Blitz, "A")
            .expect("record");
        assert_eq!(record.multiplier, 2);
        assert!(record.release_time > now);
        cleanup(&matchmaker);
    }

    #[test]
    fn aborted_game_is_charged_the_estimate() {
        let mm = blitz();
        let now = Utc::now();
        let mut matchmaker = matchmaker("aborted");
        matchmaker
            .next_challenge(&[bot("A", 10)], &mm, now, |_| false)
            .expect("pairing");

        let started_at = now - chrono::Duration::seconds(60);
        matchmaker
            .on_game_finished(&report(Some(started_at), true), &mm, now)
            .expect("outcome");

        let expected = cooldown(
            Duration::from_secs(60) + mm.estimated_game_duration(),
            mm.estimated_game_duration(),
            Duration::from_secs(10),
            15,
        );
        let record = matchmaker
            .scheduler()
            .store()
            .record(PerfType::Blitz, "A")
            .expect("record");
        assert_eq!(record.multiplier, 2);
        assert_eq!(record.next_color, Color::White);
        assert_eq!(
            record.release_time,
            now + chrono::Duration::from_std(expected).expect("duration")
        );
        cleanup(&matchmaker);
    }

    #[test]
    fn played_game_is_a_success() {
        let mm = blitz();
        let now = Utc::now();
        let mut matchmaker = matchmaker("played");
        matchmaker
            .next_challenge(&[bot("A", 10)], &mm, now, |_| false)
            .expect("pairing");

        let started_at = now - chrono::Duration::seconds(300);
        matchmaker
            .on_game_finished(&report(Some(started_at), false), &mm, now)
            .expect("outcome");

        let expected = cooldown(
            Duration::from_secs(300),
            mm.estimated_game_duration(),
            Duration::from_secs(10),
            15,
        );
        let record = matchmaker
            .scheduler()
            .store()
            .record(PerfType::Blitz, "A")
            .expect("record");
        assert_eq!(record.multiplier, 1);
        assert_eq!(record.next_color, Color::Black);
        assert_eq!(
            record.release_time,
            now + chrono::Duration::from_std(expected).expect("duration")
        );
        cleanup(&matchmaker);
    }

    #[test]
    fn unstarted_game_counts_only_the_estimate() {
        let mm = blitz();
        let now = Utc::now();
        let mut matchmaker = matchmaker("unstarted");
        matchmaker
            .next_challenge(&[bot("A", 10)], &mm, now, |_| false)
            .expect("pairing");
        matchmaker
            .on_game_finished(&report(None, true), &mm, now)
            .expect("outcome");

        let expected = cooldown(
            mm.estimated_game_duration(),
            mm.estimated_game_duration(),
            Duration::from_secs(10),
            15,
        );
        let record = matchmaker
            .scheduler()
            .store()
            .record(PerfType::Blitz, "A")
            .expect("record");
        assert_eq!(
            record.release_time,
            now + chrono::Duration::from_std(expected).expect("duration")
        );
        cleanup(&matchmaker);
    }
}
