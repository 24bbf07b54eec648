//! Best time, attempt history and their persistence.

use crate::config::{
    AVERAGE_BELOW_MS, EXCELLENT_BELOW_MS, GOOD_BELOW_MS, HISTORY_CAPACITY, STORAGE_KEY,
};
use crate::storage::{KeyValueStore, StorageError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

/// One completed reaction measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "time")]
    elapsed_ms: f64,
    #[serde(rename = "timestamp", default)]
    recorded_at: f64,
}

impl Attempt {
    pub fn new(elapsed_ms: f64, recorded_at: f64) -> Self {
        Self {
            elapsed_ms: elapsed_ms.max(0.0),
            recorded_at,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Wall-clock milliseconds since the Unix epoch.
    pub fn recorded_at(&self) -> f64 {
        self.recorded_at
    }

    fn is_valid(&self) -> bool {
        self.elapsed_ms.is_finite() && self.elapsed_ms >= 0.0 && self.recorded_at.is_finite()
    }
}

/// Qualitative rating of a best time, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpeedBand {
    Excellent,
    Good,
    Average,
    Slow,
}

impl SpeedBand {
    pub fn label(&self) -> &'static str {
        match self {
            SpeedBand::Excellent => "Lightning fast! Pro-level reactions.",
            SpeedBand::Good => "Very good. Above average speed.",
            SpeedBand::Average => "Decent. With practice, you'll improve.",
            SpeedBand::Slow => "Quite slow. Try to stay focused and relaxed.",
        }
    }
}

impl fmt::Display for SpeedBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpeedBand::Excellent => "excellent",
            SpeedBand::Good => "good",
            SpeedBand::Average => "average",
            SpeedBand::Slow => "slow",
        };
        f.write_str(name)
    }
}

/// Map a time in milliseconds onto its [`SpeedBand`].
pub fn classify(best_ms: f64) -> SpeedBand {
    if best_ms < EXCELLENT_BELOW_MS {
        SpeedBand::Excellent
    } else if best_ms < GOOD_BELOW_MS {
        SpeedBand::Good
    } else if best_ms < AVERAGE_BELOW_MS {
        SpeedBand::Average
    } else {
        SpeedBand::Slow
    }
}

/// A history row prepared for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    /// 1-based position within the stored history.
    pub sequence: usize,
    pub attempt: Attempt,
}

/// Best time plus the most recent attempts, exactly as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreRecord {
    #[serde(rename = "bestTime")]
    best_time: Option<f64>,
    history: VecDeque<Attempt>,
}

impl ScoreRecord {
    pub fn best_time(&self) -> Option<f64> {
        self.best_time
    }

    pub fn history(&self) -> &VecDeque<Attempt> {
        &self.history
    }

    pub fn band(&self) -> Option<SpeedBand> {
        self.best_time.map(classify)
    }

    /// Append an attempt, lowering the best time if needed and evicting the
    /// oldest entries beyond capacity. The best time survives eviction.
    pub fn push(&mut self, attempt: Attempt) {
        let elapsed = attempt.elapsed_ms();
        self.best_time = Some(match self.best_time {
            Some(best) => best.min(elapsed),
            None => elapsed,
        });
        self.history.push_back(attempt);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    /// Newest `count` attempts, newest first.
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        let total = self.history.len();
        self.history
            .iter()
            .rev()
            .take(count)
            .enumerate()
            .map(|(offset, attempt)| HistoryEntry {
                sequence: total - offset,
                attempt: *attempt,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.best_time.is_none() && self.history.is_empty()
    }

    pub fn encode(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Encode(e.to_string()))
    }

    /// Lenient decode: each field falls back to its default on its own, so a
    /// broken `history` does not cost the best time and vice versa. Unreadable
    /// history rows are skipped and an oversized history keeps its newest rows.
    pub fn decode(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unreadable score record: {}", e);
                return Self::default();
            }
        };

        let best_time = value
            .get("bestTime")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0);

        let mut history: VecDeque<Attempt> = match value.get("history").and_then(Value::as_array) {
            Some(rows) => rows
                .iter()
                .filter_map(|row| Attempt::deserialize(row).ok())
                .filter(Attempt::is_valid)
                .collect(),
            None => VecDeque::new(),
        };
        while history.len() > HISTORY_CAPACITY {
            history.pop_front();
        }

        Self { best_time, history }
    }
}

/// Owns the [`ScoreRecord`] and writes it back after every change.
///
/// Writes are best effort: a failing backend is logged and otherwise ignored,
/// and the in-memory record stays authoritative.
pub struct ScoreStore<K: KeyValueStore> {
    backend: K,
    record: ScoreRecord,
}

impl<K: KeyValueStore> ScoreStore<K> {
    /// Read the persisted record, starting empty when there is none or it
    /// cannot be read.
    pub fn load(backend: K) -> Self {
        let record = match backend.get(STORAGE_KEY) {
            Ok(Some(raw)) => ScoreRecord::decode(&raw),
            Ok(None) => {
                debug!("No stored score record, starting fresh");
                ScoreRecord::default()
            }
            Err(e) => {
                warn!("{}", e);
                ScoreRecord::default()
            }
        };
        info!(
            "Loaded score record: best={:?}, {} attempts",
            record.best_time,
            record.history.len()
        );
        Self { backend, record }
    }

    pub fn record(&self) -> &ScoreRecord {
        &self.record
    }

    pub fn record_attempt(&mut self, elapsed_ms: f64, recorded_at: f64) -> &ScoreRecord {
        self.record.push(Attempt::new(elapsed_ms, recorded_at));
        self.persist();
        &self.record
    }

    /// Clear best time and history. Callers are expected to have asked the user first.
    pub fn reset(&mut self) -> &ScoreRecord {
        self.record = ScoreRecord::default();
        self.persist();
        &self.record
    }

    fn persist(&self) {
        if let Err(e) = self.write() {
            warn!("Score record not saved: {}", e);
        }
    }

    fn write(&self) -> Result<(), StorageError> {
        let raw = self.record.encode()?;
        self.backend.set(STORAGE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn stored(store: &MemoryStore) -> ScoreRecord {
        ScoreRecord::decode(&store.raw(STORAGE_KEY).expect("record was written"))
    }

    #[test]
    fn classify_boundaries_are_exact() {
        assert_eq!(classify(149.0), SpeedBand::Excellent);
        assert_eq!(classify(149.999), SpeedBand::Excellent);
        assert_eq!(classify(150.0), SpeedBand::Good);
        assert_eq!(classify(249.0), SpeedBand::Good);
        assert_eq!(classify(250.0), SpeedBand::Average);
        assert_eq!(classify(349.0), SpeedBand::Average);
        assert_eq!(classify(350.0), SpeedBand::Slow);
        assert_eq!(classify(2_000.0), SpeedBand::Slow);
        assert!(SpeedBand::Excellent < SpeedBand::Good && SpeedBand::Average < SpeedBand::Slow);
    }

    #[test]
    fn best_time_is_minimum_ever_recorded_even_after_eviction() {
        let mut record = ScoreRecord::default();
        record.push(Attempt::new(90.0, 0.0));
        for i in 0..100 {
            record.push(Attempt::new(300.0 + i as f64, i as f64));
        }
        assert_eq!(record.history().len(), HISTORY_CAPACITY);
        assert!(record.history().iter().all(|a| a.elapsed_ms() >= 300.0));
        assert_eq!(record.best_time(), Some(90.0));
        assert_eq!(record.band(), Some(SpeedBand::Excellent));
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut record = ScoreRecord::default();
        for i in 0..35 {
            record.push(Attempt::new(200.0, i as f64));
        }
        assert_eq!(record.history().len(), 30);
        assert_eq!(record.history().front().map(Attempt::recorded_at), Some(5.0));
        assert_eq!(record.history().back().map(Attempt::recorded_at), Some(34.0));
    }

    #[test]
    fn recent_is_newest_first_with_sequence_numbers() {
        let mut record = ScoreRecord::default();
        for ms in [300.0, 250.0, 200.0, 180.0, 220.0, 240.0, 260.0, 210.0] {
            record.push(Attempt::new(ms, 0.0));
        }
        let rows = record.recent(6);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].sequence, 8);
        assert_eq!(rows[0].attempt.elapsed_ms(), 210.0);
        assert_eq!(rows[5].sequence, 3);
        assert_eq!(rows[5].attempt.elapsed_ms(), 200.0);
        assert!(ScoreRecord::default().recent(6).is_empty());
    }

    #[test]
    fn encoded_record_uses_storage_field_names() {
        let mut record = ScoreRecord::default();
        record.push(Attempt::new(212.5, 1_700_000_000_000.0));
        let value: Value = serde_json::from_str(&record.encode().unwrap()).unwrap();
        assert_eq!(value["bestTime"], 212.5);
        assert_eq!(value["history"][0]["time"], 212.5);
        assert_eq!(value["history"][0]["timestamp"], 1_700_000_000_000.0);

        let empty: Value = serde_json::from_str(&ScoreRecord::default().encode().unwrap()).unwrap();
        assert!(empty["bestTime"].is_null());
        assert_eq!(empty["history"], serde_json::json!([]));
    }

    #[test]
    fn decode_falls_back_per_field() {
        let record = ScoreRecord::decode(r#"{"bestTime":"fast","history":[{"time":210,"timestamp":5}]}"#);
        assert_eq!(record.best_time(), None);
        assert_eq!(record.history().len(), 1);

        let record = ScoreRecord::decode(r#"{"bestTime":180,"history":"nope","extra":true}"#);
        assert_eq!(record.best_time(), Some(180.0));
        assert!(record.history().is_empty());

        let record = ScoreRecord::decode(r#"{"history":[{"time":200},{"time":"x"},7,{"time":-4}]}"#);
        assert_eq!(record.best_time(), None);
        assert_eq!(record.history().len(), 1);
        assert_eq!(record.history()[0].recorded_at(), 0.0);
    }

    #[test]
    fn decode_of_garbage_is_empty() {
        for raw in ["", "not json", "[]", "42", "null", r#"{"bestTime":-3}"#] {
            assert!(ScoreRecord::decode(raw).is_empty(), "input {:?}", raw);
        }
    }

    #[test]
    fn decode_truncates_oversized_history() {
        let rows: Vec<String> = (0..40)
            .map(|i| format!(r#"{{"time":{},"timestamp":{}}}"#, 200 + i, i))
            .collect();
        let raw = format!(r#"{{"bestTime":150,"history":[{}]}}"#, rows.join(","));
        let record = ScoreRecord::decode(&raw);
        assert_eq!(record.history().len(), HISTORY_CAPACITY);
        assert_eq!(record.history()[0].elapsed_ms(), 210.0);
    }

    #[test]
    fn load_missing_or_corrupt_storage_is_empty() {
        let store = ScoreStore::load(MemoryStore::new());
        assert!(store.record().is_empty());

        let store = ScoreStore::load(MemoryStore::with_entry(STORAGE_KEY, "{oops"));
        assert!(store.record().is_empty());
    }

    #[test]
    fn load_with_failing_reads_is_empty() {
        let backend = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{"bestTime":120,"history":[{"time":120,"timestamp":1}]}"#,
        );
        let mut store = ScoreStore::load(backend.unreadable());
        assert!(store.record().is_empty());

        // Writes still go through once the first attempt is recorded.
        store.record_attempt(310.0, 2.0);
        assert_eq!(stored(&backend).best_time(), Some(310.0));
    }

    #[test]
    fn band_names_are_lowercase_words() {
        let names: Vec<String> = [SpeedBand::Excellent, SpeedBand::Good, SpeedBand::Average, SpeedBand::Slow]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["excellent", "good", "average", "slow"]);
    }

    #[test]
    fn record_attempt_persists_every_change() {
        let backend = MemoryStore::new();
        let mut store = ScoreStore::load(backend.clone());

        store.record_attempt(240.0, 10.0);
        store.record_attempt(260.0, 20.0);
        let persisted = stored(&backend);
        assert_eq!(persisted.best_time(), Some(240.0));
        assert_eq!(persisted.history().len(), 2);

        let reloaded = ScoreStore::load(backend.clone());
        assert_eq!(reloaded.record(), store.record());
    }

    #[test]
    fn reset_clears_and_persists() {
        let backend = MemoryStore::new();
        let mut store = ScoreStore::load(backend.clone());
        store.record_attempt(240.0, 10.0);

        let cleared = store.reset().clone();
        assert!(cleared.is_empty());
        assert!(stored(&backend).is_empty());
    }

    #[test]
    fn write_failures_are_swallowed() {
        let backend = MemoryStore::with_entry(STORAGE_KEY, r#"{"bestTime":300,"history":[]}"#);
        let mut store = ScoreStore::load(backend.read_only());

        let record = store.record_attempt(200.0, 1.0);
        assert_eq!(record.best_time(), Some(200.0));
        assert_eq!(stored(&backend).best_time(), Some(300.0));
    }
}
