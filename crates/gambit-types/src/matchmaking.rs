use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    config::MatchmakingTypeConfig,
    game::{PerfType, Variant},
    time_control::TimeControl,
};

/// An online bot that may be challenged. Identified by username only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub username: String,
    #[serde(default)]
    pub tos_violation: bool,
    /// Opponent rating minus our own rating, per performance category.
    pub rating_diffs: HashMap<PerfType, i32>,
}

impl Bot {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            tos_violation: false,
            rating_diffs: HashMap::new(),
        }
    }

    pub fn with_rating_diff(mut self, perf_type: PerfType, diff: i32) -> Self {
        self.rating_diffs.insert(perf_type, diff);
        self
    }

    /// Lookup key; two `Bot` values with the same key are the same account.
    pub fn key(&self) -> &str {
        &self.username
    }

    pub fn rating_diff(&self, perf_type: PerfType) -> Option<i32> {
        self.rating_diffs.get(&perf_type).copied()
    }
}

/// A kind of game the bot seeks on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingType {
    pub name: String,
    pub time_control: TimeControl,
    pub rated: bool,
    pub variant: Variant,
    pub perf_type: PerfType,
    pub multiplier: u32,
    pub min_rating_diff: u32,
    pub max_rating_diff: u32,
}

impl MatchmakingType {
    pub fn from_config(config: &MatchmakingTypeConfig) -> Self {
        let time_control = TimeControl::new(config.initial_time, config.increment);
        Self {
            name: config.name.clone(),
            time_control,
            rated: config.rated,
            variant: config.variant,
            perf_type: time_control.perf_type(config.variant),
            multiplier: config.multiplier.max(1),
            min_rating_diff: config.min_rating_diff,
            max_rating_diff: config.max_rating_diff.unwrap_or(u32::MAX),
        }
    }

    pub fn estimated_game_duration(&self) -> Duration {
        self.time_control.estimated_game_duration()
    }

    pub fn accepts_rating_diff(&self, diff: i32) -> bool {
        (self.min_rating_diff..=self.max_rating_diff).contains(&diff.unsigned_abs())
    }

    pub fn to_str(&self) -> String {
        let rated = if self.rated { "Rated" } else { "Casual" };
        [
            self.name.clone(),
            self.time_control.tc_str(),
            rated.to_string(),
            format!("Variant: {}", self.variant),
            format!("Perf: {}", self.perf_type),
        ]
        .join("     ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_window_is_inclusive() {
        let config = MatchmakingTypeConfig {
            name: "blitz".into(),
            initial_time: 180,
            increment: 0,
            rated: true,
            variant: Variant::Standard,
            multiplier: 0,
            min_rating_diff: 50,
            max_rating_diff: Some(200),
        };
        let mm = MatchmakingType::from_config(&config);
        assert_eq!(mm.multiplier, 1);
        assert_eq!(mm.perf_type, PerfType::Blitz);
        assert!(mm.accepts_rating_diff(-50));
        assert!(mm.accepts_rating_diff(200));
        assert!(!mm.accepts_rating_diff(49));
        assert!(!mm.accepts_rating_diff(-201));
    }

    #[test]
    fn description_names_variant_and_perf() {
        let config = MatchmakingTypeConfig {
            name: "zh".into(),
            initial_time: 180,
            increment: 2,
            rated: false,
            variant: Variant::Crazyhouse,
            multiplier: 15,
            min_rating_diff: 0,
            max_rating_diff: None,
        };
        let line = MatchmakingType::from_config(&config).to_str();
        assert!(line.contains("Casual"));
        assert!(line.contains("Variant: crazyhouse"));
        assert!(line.contains("Perf: crazyhouse"));

        let standard = MatchmakingType::from_config(&MatchmakingTypeConfig {
            variant: Variant::Standard,
            ..config
        });
        assert!(standard.to_str().contains("Variant: standard"));
        assert!(standard.to_str().contains("Perf: blitz"));
    }
}
