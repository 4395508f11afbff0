//! Training statistics, versioned and persisted through a [`StatsStore`].
//!
//! The engine never reads or writes stats by itself; callers pass the
//! aggregate around explicitly and decide when to save it. All time-dependent
//! operations take the current instant as an argument.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::{decision::Decision, difficulty::Difficulty, strategy::Category, Action};

pub const STATS_VERSION: u64 = 2;
pub const MAX_RECENT_MISTAKES: usize = 20;
pub const PROGRESS_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("cannot access stats file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed stats: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported stats version {0}")]
    UnsupportedVersion(u64),
    #[error("malformed legacy stats: {0}")]
    MalformedLegacy(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
    pub accuracy: f64,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = self.correct as f64 / self.total as f64;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifetime {
    pub total_sessions: u32,
    pub total_decisions: u32,
    pub correct_decisions: u32,
    pub overall_accuracy: f64,
    pub best_streak: u32,
    pub total_time_ms: u64,
    /// RFC 3339 timestamp.
    pub last_played: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    pub timestamp: String,
    pub category: Category,
    pub player_total: Option<u8>,
    pub dealer_up: u8,
    pub chosen_action: Action,
    pub correct_action: Action,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub time_taken_ms: u64,
}

/// Decisions made on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub decisions: u32,
    pub correct: u32,
    pub accuracy: f64,
}

/// What the caller reports after each move.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub correct: bool,
    pub difficulty: Option<Difficulty>,
    pub category: Category,
    pub chosen_action: Action,
    pub correct_action: Action,
    pub player_total: Option<u8>,
    pub dealer_up: u8,
    pub time_taken_ms: u64,
}

impl DecisionRecord {
    pub fn from_decision(
        decision: &Decision,
        difficulty: Option<Difficulty>,
        time_taken_ms: u64,
    ) -> Self {
        DecisionRecord {
            correct: decision.correct,
            difficulty,
            category: decision.category,
            chosen_action: decision.chosen_action,
            correct_action: decision.correct_action,
            player_total: decision.total,
            dealer_up: decision.dealer_up_value,
            time_taken_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub version: u64,
    pub lifetime: Lifetime,
    pub by_difficulty: BTreeMap<Difficulty, Tally>,
    pub by_category: BTreeMap<Category, Tally>,
    pub by_decision_type: BTreeMap<Action, Tally>,
    pub recent_mistakes: Vec<Mistake>,
    pub progress_history: Vec<ProgressEntry>,
    /// Unix milliseconds of the open session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "sessionStartTime")]
    pub session_start_ms: Option<i64>,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            version: STATS_VERSION,
            lifetime: Lifetime::default(),
            by_difficulty: Difficulty::iter().map(|d| (d, Tally::default())).collect(),
            by_category: [Category::Hard, Category::Soft, Category::Pair]
                .into_iter()
                .map(|c| (c, Tally::default()))
                .collect(),
            by_decision_type: [Action::Hit, Action::Stand, Action::Double, Action::Split]
                .into_iter()
                .map(|a| (a, Tally::default()))
                .collect(),
            recent_mistakes: Vec::new(),
            progress_history: Vec::new(),
            session_start_ms: None,
        }
    }
}

fn timestamp(now: OffsetDateTime) -> String {
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

fn unix_ms(now: OffsetDateTime) -> i64 {
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}

impl Stats {
    pub fn record_decision(&mut self, record: &DecisionRecord, now: OffsetDateTime) {
        let lifetime = &mut self.lifetime;
        lifetime.total_decisions += 1;
        if record.correct {
            lifetime.correct_decisions += 1;
        }
        lifetime.overall_accuracy =
            lifetime.correct_decisions as f64 / lifetime.total_decisions as f64;
        lifetime.last_played = Some(timestamp(now));

        if let Some(difficulty) = record.difficulty {
            self.by_difficulty
                .entry(difficulty)
                .or_default()
                .record(record.correct);
        }
        self.by_category
            .entry(record.category)
            .or_default()
            .record(record.correct);
        // Only the four trained decision types are tallied.
        if let Some(tally) = self.by_decision_type.get_mut(&record.chosen_action) {
            tally.record(record.correct);
        }

        if !record.correct {
            self.recent_mistakes.insert(
                0,
                Mistake {
                    timestamp: timestamp(now),
                    category: record.category,
                    player_total: record.player_total,
                    dealer_up: record.dealer_up,
                    chosen_action: record.chosen_action,
                    correct_action: record.correct_action,
                    difficulty: record.difficulty,
                    time_taken_ms: record.time_taken_ms,
                },
            );
            self.recent_mistakes.truncate(MAX_RECENT_MISTAKES);
        }

        self.update_progress_history(record.correct, now);
    }

    fn update_progress_history(&mut self, correct: bool, now: OffsetDateTime) {
        let today = now.date().to_string();
        let index = match self.progress_history.iter().position(|e| e.date == today) {
            Some(index) => index,
            None => {
                self.progress_history.push(ProgressEntry {
                    date: today,
                    decisions: 0,
                    correct: 0,
                    accuracy: 0.0,
                });
                self.progress_history.len() - 1
            }
        };
        let entry = &mut self.progress_history[index];
        entry.decisions += 1;
        if correct {
            entry.correct += 1;
        }
        entry.accuracy = entry.correct as f64 / entry.decisions as f64;

        let cutoff = (now - Duration::days(PROGRESS_HISTORY_DAYS)).date().to_string();
        self.progress_history.retain(|e| e.date >= cutoff);
        self.progress_history.sort_by(|a, b| a.date.cmp(&b.date));
    }

    pub fn start_session(&mut self, now: OffsetDateTime) {
        self.lifetime.total_sessions += 1;
        self.session_start_ms = Some(unix_ms(now));
    }

    /// Adds the open session's duration to the lifetime total. No-op when no
    /// session is open.
    pub fn end_session(&mut self, now: OffsetDateTime) {
        if let Some(start) = self.session_start_ms.take() {
            let duration = (unix_ms(now) - start).max(0) as u64;
            self.lifetime.total_time_ms += duration;
        }
    }

    /// Returns true if `streak` is a new best.
    pub fn update_best_streak(&mut self, streak: u32) -> bool {
        if streak > self.lifetime.best_streak {
            self.lifetime.best_streak = streak;
            true
        } else {
            false
        }
    }

    pub fn summary(&self) -> StatsSummary {
        let percent = |accuracy: f64| (accuracy * 100.0).round() as u32;
        StatsSummary {
            decisions: self.lifetime.total_decisions,
            accuracy: percent(self.lifetime.overall_accuracy),
            best_streak: self.lifetime.best_streak,
            sessions: self.lifetime.total_sessions,
            total_hours: (self.lifetime.total_time_ms as f64 / 3_600_000.0 * 10.0).round() / 10.0,
            last_played: self.lifetime.last_played.clone(),
            difficulty: self
                .by_difficulty
                .iter()
                .map(|(d, t)| BucketSummary {
                    name: d.to_string(),
                    accuracy: percent(t.accuracy),
                    total: t.total,
                })
                .collect(),
            category: self
                .by_category
                .iter()
                .map(|(c, t)| BucketSummary {
                    name: c.to_string(),
                    accuracy: percent(t.accuracy),
                    total: t.total,
                })
                .collect(),
        }
    }

    pub fn export_json(&self) -> Result<String, StatsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Accepts only current-version exports.
    pub fn import_json(json: &str) -> Result<Stats, StatsError> {
        let value: Value = serde_json::from_str(json)?;
        match version_of(&value) {
            STATS_VERSION => Ok(serde_json::from_value(value)?),
            other => Err(StatsError::UnsupportedVersion(other)),
        }
    }

    /// Reads a stored blob of any known version, upgrading older ones.
    pub fn from_stored_json(json: &str, now: OffsetDateTime) -> Result<Stats, StatsError> {
        let value: Value = serde_json::from_str(json)?;
        migrate(version_of(&value), &value, now)
    }
}

fn version_of(value: &Value) -> u64 {
    value.get("version").and_then(Value::as_u64).unwrap_or(0)
}

/// Upgrades a stored blob to the current schema. Version 0 means the blob had
/// no version field, which is how the first schema was written.
pub fn migrate(version: u64, blob: &Value, now: OffsetDateTime) -> Result<Stats, StatsError> {
    if version == STATS_VERSION {
        return Ok(serde_json::from_value(blob.clone())?);
    }
    if version > STATS_VERSION {
        return Err(StatsError::UnsupportedVersion(version));
    }

    let fields = blob
        .as_object()
        .ok_or_else(|| StatsError::MalformedLegacy(String::from("expected a JSON object")))?;
    let field = |name: &str| match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| StatsError::MalformedLegacy(format!("{} is not a count", name))),
    };

    let mut stats = Stats::default();
    if let Some(best_streak) = field("bestStreak")? {
        stats.lifetime.best_streak = best_streak as u32;
    }
    if let (Some(correct), Some(attempts)) = (field("totalCorrect")?, field("totalAttempts")?) {
        stats.lifetime.total_decisions = attempts as u32;
        stats.lifetime.correct_decisions = correct as u32;
        stats.lifetime.overall_accuracy = if attempts > 0 {
            correct as f64 / attempts as f64
        } else {
            0.0
        };
    }
    stats.lifetime.last_played = Some(timestamp(now));
    tracing::warn!(from = version, to = STATS_VERSION, "migrated stored stats");
    Ok(stats)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub name: String,
    pub accuracy: u32,
    pub total: u32,
}

/// Rounded figures for display. Accuracies are whole percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub decisions: u32,
    pub accuracy: u32,
    pub best_streak: u32,
    pub sessions: u32,
    pub total_hours: f64,
    pub last_played: Option<String>,
    pub difficulty: Vec<BucketSummary>,
    pub category: Vec<BucketSummary>,
}

/// Persistence port for [`Stats`].
pub trait StatsStore {
    /// Missing data yields default stats, not an error.
    fn load(&self) -> Result<Stats, StatsError>;
    fn save(&mut self, stats: &Stats) -> Result<(), StatsError>;
}

/// Stats kept as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStatsStore {
    path: PathBuf,
}

impl JsonFileStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStatsStore { path: path.into() }
    }
}

impl StatsStore for JsonFileStatsStore {
    fn load(&self) -> Result<Stats, StatsError> {
        if !self.path.exists() {
            return Ok(Stats::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Stats::from_stored_json(&json, OffsetDateTime::now_utc())
    }

    fn save(&mut self, stats: &Stats) -> Result<(), StatsError> {
        fs::write(&self.path, stats.export_json()?)?;
        Ok(())
    }
}

/// Stats kept in memory as serialized JSON, as a file store would see them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsStore {
    blob: Option<String>,
}

impl MemoryStatsStore {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryStatsStore {
            blob: Some(blob.into()),
        }
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self) -> Result<Stats, StatsError> {
        match &self.blob {
            None => Ok(Stats::default()),
            Some(json) => Stats::from_stored_json(json, OffsetDateTime::now_utc()),
        }
    }

    fn save(&mut self, stats: &Stats) -> Result<(), StatsError> {
        self.blob = Some(serde_json::to_string(stats)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(correct: bool, chosen: Action) -> DecisionRecord {
        DecisionRecord {
            correct,
            difficulty: Some(Difficulty::Hard),
            category: Category::Hard,
            chosen_action: chosen,
            correct_action: Action::Hit,
            player_total: Some(16),
            dealer_up: 10,
            time_taken_ms: 800,
        }
    }

    #[test]
    fn records_update_every_tally() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let mut stats = Stats::default();
        stats.record_decision(&record(true, Action::Hit), now);
        stats.record_decision(&record(false, Action::Stand), now);

        assert_eq!(stats.lifetime.total_decisions, 2);
        assert_eq!(stats.lifetime.correct_decisions, 1);
        assert!((stats.lifetime.overall_accuracy - 0.5).abs() < 1e-12);
        assert_eq!(stats.by_difficulty[&Difficulty::Hard].total, 2);
        assert_eq!(stats.by_category[&Category::Hard].correct, 1);
        assert_eq!(stats.by_decision_type[&Action::Stand].total, 1);
        assert_eq!(stats.by_decision_type[&Action::Hit].accuracy, 1.0);
        assert_eq!(stats.recent_mistakes.len(), 1);
        assert_eq!(stats.recent_mistakes[0].chosen_action, Action::Stand);
        assert_eq!(stats.lifetime.last_played.as_deref(), Some("2024-03-01T12:00:00Z"));
    }

    #[test]
    fn surrender_is_not_a_tracked_decision_type() {
        let mut stats = Stats::default();
        stats.record_decision(&record(false, Action::Surrender), datetime!(2024-03-01 0:00 UTC));
        assert!(!stats.by_decision_type.contains_key(&Action::Surrender));
        assert_eq!(stats.lifetime.total_decisions, 1);
    }

    #[test]
    fn recent_mistakes_are_newest_first_and_capped() {
        let mut stats = Stats::default();
        let start = datetime!(2024-03-01 12:00 UTC);
        for i in 0..25 {
            let mut r = record(false, Action::Stand);
            r.time_taken_ms = i;
            stats.record_decision(&r, start + Duration::seconds(i as i64));
        }
        assert_eq!(stats.recent_mistakes.len(), MAX_RECENT_MISTAKES);
        assert_eq!(stats.recent_mistakes[0].time_taken_ms, 24);
        assert_eq!(stats.recent_mistakes[19].time_taken_ms, 5);
    }

    #[test]
    fn progress_history_keeps_thirty_days_in_order() {
        let mut stats = Stats::default();
        let start = datetime!(2024-01-01 10:00 UTC);
        for day in 0..40 {
            let now = start + Duration::days(day);
            stats.record_decision(&record(true, Action::Hit), now);
            stats.record_decision(&record(day % 2 == 0, Action::Hit), now);
        }
        let history = &stats.progress_history;
        assert_eq!(history.len(), 31);
        assert_eq!(history.last().unwrap().date, "2024-02-09");
        assert_eq!(history.first().unwrap().date, "2024-01-10");
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
        let last = history.last().unwrap();
        assert_eq!(last.decisions, 2);
        assert_eq!(last.correct, 1);
    }

    #[test]
    fn sessions_accumulate_time() {
        let mut stats = Stats::default();
        let start = datetime!(2024-03-01 12:00 UTC);
        stats.start_session(start);
        stats.end_session(start + Duration::minutes(90));
        stats.end_session(start + Duration::minutes(200));
        assert_eq!(stats.lifetime.total_sessions, 1);
        assert_eq!(stats.lifetime.total_time_ms, 90 * 60 * 1000);
        assert_eq!(stats.summary().total_hours, 1.5);
        assert!(stats.update_best_streak(7));
        assert!(!stats.update_best_streak(3));
        assert_eq!(stats.summary().best_streak, 7);
    }

    #[test]
    fn migrates_first_version_blobs() {
        let blob: Value =
            serde_json::from_str(r#"{"bestStreak": 12, "totalCorrect": 30, "totalAttempts": 40}"#)
                .unwrap();
        let now = datetime!(2024-05-05 8:30 UTC);
        let stats = migrate(1, &blob, now).unwrap();
        assert_eq!(stats.version, STATS_VERSION);
        assert_eq!(stats.lifetime.best_streak, 12);
        assert_eq!(stats.lifetime.total_decisions, 40);
        assert!((stats.lifetime.overall_accuracy - 0.75).abs() < 1e-12);
        assert!(stats.lifetime.last_played.is_some());

        let unversioned = Stats::from_stored_json(r#"{"bestStreak": 3}"#, now).unwrap();
        assert_eq!(unversioned.lifetime.best_streak, 3);
        assert_eq!(unversioned.lifetime.total_decisions, 0);

        assert!(matches!(
            migrate(3, &blob, now),
            Err(StatsError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn rejects_malformed_legacy_blobs() {
        let now = datetime!(2024-05-05 8:30 UTC);
        assert!(matches!(
            Stats::from_stored_json("[1, 2]", now),
            Err(StatsError::MalformedLegacy(_))
        ));
        assert!(matches!(
            Stats::from_stored_json(r#"{"bestStreak": "twelve"}"#, now),
            Err(StatsError::MalformedLegacy(_))
        ));
        assert!(matches!(
            MemoryStatsStore::with_blob("7").load(),
            Err(StatsError::MalformedLegacy(_))
        ));
        let nulls = Stats::from_stored_json(r#"{"bestStreak": null}"#, now).unwrap();
        assert_eq!(nulls.lifetime.best_streak, 0);
    }

    #[test]
    fn export_and_import_round_trip() {
        let mut stats = Stats::default();
        let now = datetime!(2024-03-01 12:00 UTC);
        stats.record_decision(&record(false, Action::Double), now);
        let json = stats.export_json().unwrap();
        assert!(json.contains("\"byDecisionType\""));
        assert!(json.contains("\"HARD\""));
        assert_eq!(Stats::import_json(&json).unwrap(), stats);
        assert!(matches!(
            Stats::import_json(r#"{"version": 1}"#),
            Err(StatsError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn stores_load_defaults_then_round_trip() {
        let mut memory = MemoryStatsStore::default();
        assert_eq!(memory.load().unwrap(), Stats::default());
        let mut stats = Stats::default();
        stats.update_best_streak(4);
        memory.save(&stats).unwrap();
        assert_eq!(memory.load().unwrap(), stats);

        let dir = tempfile::tempdir().unwrap();
        let mut file = JsonFileStatsStore::new(dir.path().join("stats.json"));
        assert_eq!(file.load().unwrap(), Stats::default());
        file.save(&stats).unwrap();
        assert_eq!(file.load().unwrap(), stats);

        let legacy = MemoryStatsStore::with_blob(r#"{"totalCorrect": 1, "totalAttempts": 2}"#);
        assert_eq!(legacy.load().unwrap().lifetime.total_decisions, 2);
    }
}
