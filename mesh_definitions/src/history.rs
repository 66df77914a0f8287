//! The History Ledger: four bounded FIFO queues persisted as one
//! opaque output in the desired-state store.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Failed,
    Warning,
    Partial,
    #[serde(rename = "in-progress")]
    InProgress,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationCategory {
    Backup,
    Upgrade,
    Health,
    Benchmark,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub status: HistoryStatus,
    /// Category-specific payload, kept untyped since the categories carry
    /// unrelated shapes (backup manifest ids, upgrade version deltas,
    /// health summaries, benchmark numbers).
    pub payload: serde_json::Value,
    pub duration_ms: u64,
    pub error: Option<String>,
}

const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoundedQueue {
    max_entries: usize,
    entries: VecDeque<HistoryEntry>,
}

impl BoundedQueue {
    pub fn new(max_entries: usize) -> Self {
        BoundedQueue {
            max_entries,
            entries: VecDeque::new(),
        }
    }

    /// Appends `entry`, evicting the oldest entry first if the queue is
    /// already at `max_entries`.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn oldest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }
}

impl Default for BoundedQueue {
    fn default() -> Self {
        BoundedQueue::new(DEFAULT_MAX_ENTRIES)
    }
}

/// Four parallel queues, one per lifecycle category, re-read before every
/// operation and written back as a single opaque stack output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OperationsHistory {
    pub backup: BoundedQueue,
    pub upgrade: BoundedQueue,
    pub health: BoundedQueue,
    pub benchmark: BoundedQueue,
    pub last_updated: DateTime<Utc>,
}

impl OperationsHistory {
    pub fn new(max_entries: usize) -> Self {
        OperationsHistory {
            backup: BoundedQueue::new(max_entries),
            upgrade: BoundedQueue::new(max_entries),
            health: BoundedQueue::new(max_entries),
            benchmark: BoundedQueue::new(max_entries),
            last_updated: Utc::now(),
        }
    }

    fn queue_mut(&mut self, category: OperationCategory) -> &mut BoundedQueue {
        match category {
            OperationCategory::Backup => &mut self.backup,
            OperationCategory::Upgrade => &mut self.upgrade,
            OperationCategory::Health => &mut self.health,
            OperationCategory::Benchmark => &mut self.benchmark,
        }
    }

    pub fn queue(&self, category: OperationCategory) -> &BoundedQueue {
        match category {
            OperationCategory::Backup => &self.backup,
            OperationCategory::Upgrade => &self.upgrade,
            OperationCategory::Health => &self.health,
            OperationCategory::Benchmark => &self.benchmark,
        }
    }

    /// Appends `entry` under `category` and bumps `last_updated`. The
    /// caller is responsible for stamping `entry.timestamp` (this crate
    /// does not call `Utc::now()` inside library logic so that it stays
    /// deterministic under test; only this method's own bookkeeping
    /// timestamp advances).
    pub fn record(&mut self, category: OperationCategory, entry: HistoryEntry, now: DateTime<Utc>) {
        self.queue_mut(category).push(entry);
        self.last_updated = now;
    }
}

impl Default for OperationsHistory {
    fn default() -> Self {
        OperationsHistory::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(n: u32, ts: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id: format!("backup-{}", n),
            timestamp: ts,
            operation: "backup".into(),
            status: HistoryStatus::Success,
            payload: serde_json::json!({ "n": n }),
            duration_ms: 10,
            error: None,
        }
    }

    #[test]
    fn fifo_eviction_bounds_queue_length() {
        let mut hist = OperationsHistory::new(50);
        let base = Utc.ymd(2026, 1, 1).and_hms(0, 0, 0);
        for n in 0..51u32 {
            let now = base + chrono::Duration::seconds(n as i64);
            hist.record(OperationCategory::Backup, entry(n, now), now);
        }
        assert_eq!(hist.backup.len(), 50);
        assert_eq!(hist.backup.oldest().unwrap().id, "backup-1");
        assert_eq!(hist.backup.latest().unwrap().id, "backup-50");
    }

    #[test]
    fn last_updated_advances_monotonically() {
        let mut hist = OperationsHistory::new(5);
        let t1 = Utc.ymd(2026, 1, 1).and_hms(0, 0, 0);
        let t2 = t1 + chrono::Duration::seconds(1);
        hist.record(OperationCategory::Health, entry(0, t1), t1);
        assert_eq!(hist.last_updated, t1);
        hist.record(OperationCategory::Health, entry(1, t2), t2);
        assert_eq!(hist.last_updated, t2);
    }

    #[test]
    fn categories_are_independent_queues() {
        let mut hist = OperationsHistory::new(5);
        let t = Utc.ymd(2026, 1, 1).and_hms(0, 0, 0);
        hist.record(OperationCategory::Backup, entry(0, t), t);
        assert_eq!(hist.backup.len(), 1);
        assert_eq!(hist.upgrade.len(), 0);
        assert_eq!(hist.health.len(), 0);
        assert_eq!(hist.benchmark.len(), 0);
    }
}
