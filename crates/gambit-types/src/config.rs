use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{game::Variant, GambitError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    pub data_dir: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            data_dir: ".".into(),
        }
    }
}

fn default_bot_abort_secs() -> u64 {
    30
}

fn default_human_abort_secs() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Grace period before an unstarted game against a bot is aborted.
    #[serde(default = "default_bot_abort_secs")]
    pub bot_abort_secs: u64,
    #[serde(default = "default_human_abort_secs")]
    pub human_abort_secs: u64,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl SessionConfig {
    pub fn abort_grace(&self, opponent_is_bot: bool) -> Duration {
        if opponent_is_bot {
            Duration::from_secs(self.bot_abort_secs)
        } else {
            Duration::from_secs(self.human_abort_secs)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bot_abort_secs: default_bot_abort_secs(),
            human_abort_secs: default_human_abort_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_multiplier() -> u32 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingTypeConfig {
    pub name: String,
    /// Initial clock in seconds.
    pub initial_time: u64,
    /// Increment in seconds.
    pub increment: u64,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default)]
    pub min_rating_diff: u32,
    #[serde(default)]
    pub max_rating_diff: Option<u32>,
}

fn default_delay_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingConfig {
    /// Fixed delay added to every cooldown.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub types: Vec<MatchmakingTypeConfig>,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            blacklist: Vec::new(),
            types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GambitConfig {
    pub username: String,
    #[serde(default)]
    pub ops: OpsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
}

impl GambitConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            GambitError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            GambitError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(GambitError::Configuration(
                "username must not be empty".into(),
            ));
        }
        if self.session.event_buffer == 0 {
            return Err(GambitError::Configuration(
                "session.event_buffer must be greater than zero".into(),
            ));
        }
        if self.matchmaking.types.is_empty() {
            return Err(GambitError::Configuration(
                "matchmaking.types must contain at least one entry".into(),
            ));
        }
        for mm in &self.matchmaking.types {
            if mm.initial_time == 0 && mm.increment == 0 {
                return Err(GambitError::Configuration(format!(
                    "matchmaking type '{}' needs a non-zero time control",
                    mm.name
                )));
            }
            if let Some(max) = mm.max_rating_diff {
                if mm.min_rating_diff > max {
                    return Err(GambitError::Configuration(format!(
                        "matchmaking type '{}' has min_rating_diff above max_rating_diff",
                        mm.name
                    )));
                }
            }
        }
        Ok(())
    }
}
