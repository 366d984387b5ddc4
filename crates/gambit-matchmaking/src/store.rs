use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use gambit_types::{color::Color, game::PerfType, GambitError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Cooldown state of one opponent in one performance category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingRecord {
    #[serde(with = "release_time_format")]
    pub release_time: DateTime<Utc>,
    pub multiplier: u32,
    #[serde(default, rename = "color")]
    pub next_color: Color,
}

impl MatchmakingRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            release_time: now,
            multiplier: 1,
            next_color: Color::White,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opponent {
    pub username: String,
    pub records: BTreeMap<PerfType, MatchmakingRecord>,
    /// Records under category keys this build does not know; written back unchanged.
    pub unknown_records: BTreeMap<String, MatchmakingRecord>,
}

impl Opponent {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            records: BTreeMap::new(),
            unknown_records: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.username
    }
}

/// File representation: `{"username": ..., "<perf>": {record}, ...}`.
#[derive(Serialize, Deserialize)]
struct OpponentEntry {
    username: String,
    #[serde(flatten)]
    records: BTreeMap<String, MatchmakingRecord>,
}

impl From<&Opponent> for OpponentEntry {
    fn from(opponent: &Opponent) -> Self {
        Self {
            username: opponent.username.clone(),
            records: opponent
                .unknown_records
                .iter()
                .map(|(key, record)| (key.clone(), record.clone()))
                .chain(
                    opponent
                        .records
                        .iter()
                        .map(|(perf, record)| (perf.key().to_string(), record.clone())),
                )
                .collect(),
        }
    }
}

impl From<OpponentEntry> for Opponent {
    fn from(entry: OpponentEntry) -> Self {
        let mut records = BTreeMap::new();
        let mut unknown_records = BTreeMap::new();
        for (key, mut record) in entry.records {
            match PerfType::from_key(&key) {
                Some(perf) => {
                    record.multiplier = record.multiplier.max(1);
                    records.insert(perf, record);
                }
                None => {
                    warn!(username = %entry.username, key = %key, "keeping record of unknown performance category");
                    unknown_records.insert(key, record);
                }
            }
        }
        Self {
            username: entry.username,
            records,
            unknown_records,
        }
    }
}

/// All known opponents, backed by one JSON file.
#[derive(Debug, Clone)]
pub struct OpponentStore {
    path: PathBuf,
    opponents: Vec<Opponent>,
}

impl OpponentStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            opponents: Vec::new(),
        }
    }

    /// Reads the store at `path`; a missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Ok(Self::empty(path));
        }
        let contents = fs::read_to_string(&path).map_err(|err| {
            GambitError::Persistence(format!("unable to read {}: {err}", path.display()))
        })?;
        let entries: Vec<OpponentEntry> = serde_json::from_str(&contents).map_err(|err| {
            GambitError::Persistence(format!("failed to parse {}: {err}", path.display()))
        })?;

        let mut store = Self::empty(path);
        for opponent in entries.into_iter().map(Opponent::from) {
            store.upsert(opponent);
        }
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        let entries: Vec<OpponentEntry> = self.opponents.iter().map(OpponentEntry::from).collect();
        let doc = serde_json::to_string_pretty(&entries)
            .map_err(|err| GambitError::Persistence(format!("failed to encode store: {err}")))?;
        fs::write(&self.path, doc).map_err(|err| {
            GambitError::Persistence(format!("unable to write {}: {err}", self.path.display()))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn opponents(&self) -> &[Opponent] {
        &self.opponents
    }

    pub fn get(&self, username: &str) -> Option<&Opponent> {
        self.opponents.iter().find(|opponent| opponent.key() == username)
    }

    pub fn record(&self, perf_type: PerfType, username: &str) -> Option<&MatchmakingRecord> {
        self.get(username)
            .and_then(|opponent| opponent.records.get(&perf_type))
    }

    /// Record for `username` in `perf_type`, created released at `now` if unknown.
    pub fn record_mut(
        &mut self,
        perf_type: PerfType,
        username: &str,
        now: DateTime<Utc>,
    ) -> &mut MatchmakingRecord {
        let index = match self.opponents.iter().position(|o| o.key() == username) {
            Some(index) => index,
            None => {
                self.opponents.push(Opponent::new(username));
                self.opponents.len() - 1
            }
        };
        self.opponents[index]
            .records
            .entry(perf_type)
            .or_insert_with(|| MatchmakingRecord::new(now))
    }

    /// Inserts `opponent`, merging its records into an existing entry with the same key.
    pub fn upsert(&mut self, opponent: Opponent) {
        match self.opponents.iter_mut().find(|o| o.key() == opponent.key()) {
            Some(existing) => {
                warn!(username = %opponent.username, "duplicate opponent entry merged");
                existing.records.extend(opponent.records);
                existing.unknown_records.extend(opponent.unknown_records);
            }
            None => self.opponents.push(opponent),
        }
    }

    pub fn reset_release_time(&mut self, perf_type: PerfType, now: DateTime<Utc>) {
        for opponent in &mut self.opponents {
            if let Some(record) = opponent.records.get_mut(&perf_type) {
                record.release_time = now;
            }
        }
    }

    /// Opponents with history in `perf_type`, soonest release first.
    pub fn in_category(&self, perf_type: PerfType) -> Vec<(&str, &MatchmakingRecord)> {
        let mut listed: Vec<_> = self
            .opponents
            .iter()
            .filter_map(|o| o.records.get(&perf_type).map(|r| (o.key(), r)))
            .collect();
        listed.sort_by_key(|(_, record)| record.release_time);
        listed
    }
}

/// Parses a stored timestamp. Values without an offset are local wall-clock time.
pub fn parse_release_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

mod release_time_format {
    use super::*;
    use serde::{de::Error, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_release_time(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid release_time '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};

    fn temp_store(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gambit-store-{name}.json"));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn round_trip_preserves_records_to_the_second() {
        let path = temp_store("round-trip");
        let now = Utc::now();
        let mut store = OpponentStore::empty(&path);
        {
            let record = store.record_mut(PerfType::Blitz, "alpha", now);
            record.release_time = now + Duration::minutes(42);
            record.multiplier = 6;
            record.next_color = Color::Black;
        }
        store.record_mut(PerfType::Bullet, "alpha", now);
        store.record_mut(PerfType::Rapid, "beta", now).multiplier = 2;
        store.save().expect("save store");

        let loaded = OpponentStore::load(&path).expect("load store");
        let names: Vec<&str> = loaded.opponents().iter().map(Opponent::key).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let alpha = loaded.record(PerfType::Blitz, "alpha").expect("alpha blitz");
        assert_eq!(alpha.release_time, (now + Duration::minutes(42)).trunc_subsecs(0));
        assert_eq!(alpha.multiplier, 6);
        assert_eq!(alpha.next_color, Color::Black);
        assert_eq!(loaded.record(PerfType::Bullet, "alpha").map(|r| r.multiplier), Some(1));
        assert_eq!(loaded.record(PerfType::Rapid, "beta").map(|r| r.multiplier), Some(2));
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn loads_legacy_entries() {
        let path = temp_store("legacy");
        fs::write(
            &path,
            r#"[
                {"username": "gamma", "blitz": {"release_time": "2024-03-01T12:30:00", "multiplier": 0}, "correspondence": {"release_time": "2024-03-01T12:30:00", "multiplier": 3}},
                {"username": "gamma", "rapid": {"release_time": "2024-03-01T12:30:00+00:00", "multiplier": 2}}
            ]"#,
        )
        .expect("write legacy file");

        let store = OpponentStore::load(&path).expect("load legacy store");
        assert_eq!(store.opponents().len(), 1);
        let blitz = store.record(PerfType::Blitz, "gamma").expect("blitz record");
        assert_eq!(blitz.multiplier, 1);
        assert_eq!(blitz.next_color, Color::White);
        let rapid = store.record(PerfType::Rapid, "gamma").expect("rapid record");
        assert_eq!(rapid.release_time.to_rfc3339(), "2024-03-01T12:30:00+00:00");
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn unknown_categories_survive_a_rewrite() {
        let path = temp_store("unknown-category");
        fs::write(
            &path,
            r#"[{"username": "delta", "blitz": {"release_time": "2024-03-01T12:30:00+00:00", "multiplier": 2}, "correspondence": {"release_time": "2024-03-01T12:30:00+00:00", "multiplier": 3, "color": "black"}}]"#,
        )
        .expect("write store");

        let mut store = OpponentStore::load(&path).expect("load store");
        let delta = store.get("delta").expect("delta");
        assert_eq!(delta.records.len(), 1);
        assert_eq!(delta.unknown_records["correspondence"].multiplier, 3);

        store.record_mut(PerfType::Blitz, "delta", Utc::now()).multiplier = 4;
        store.save().expect("save store");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read store")).expect("json");
        assert_eq!(raw[0]["correspondence"]["multiplier"], 3);
        assert_eq!(raw[0]["correspondence"]["color"], "black");
        assert_eq!(raw[0]["blitz"]["multiplier"], 4);
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn missing_file_is_empty_and_corrupt_file_errors() {
        let path = temp_store("missing");
        assert!(OpponentStore::load(&path).expect("empty store").opponents().is_empty());

        fs::write(&path, "{ nope").expect("write corrupt file");
        assert!(matches!(
            OpponentStore::load(&path),
            Err(GambitError::Persistence(_))
        ));
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn reset_and_listing_touch_one_category() {
        let now = Utc::now();
        let later = now + Duration::hours(3);
        let mut store = OpponentStore::empty(temp_store("reset"));
        store.record_mut(PerfType::Blitz, "late", now).release_time = later;
        store.record_mut(PerfType::Blitz, "soon", now).release_time = now + Duration::hours(1);
        store.record_mut(PerfType::Rapid, "late", now).release_time = later;

        let listed: Vec<&str> = store
            .in_category(PerfType::Blitz)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(listed, vec!["soon", "late"]);

        store.reset_release_time(PerfType::Blitz, now);
        assert_eq!(store.record(PerfType::Blitz, "late").map(|r| r.release_time), Some(now));
        assert_eq!(store.record(PerfType::Rapid, "late").map(|r| r.release_time), Some(later));
    }
}
