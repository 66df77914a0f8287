//! History Ledger storage: `OperationsHistory` itself is pure data in
//! `mesh_definitions::history`; this module is the seam that reads it from
//! and writes it back to a stack's desired-state output, so the ledger can
//! be exercised against an in-memory double without a real state engine.
use std::collections::HashMap;
use std::sync::Mutex;

use mesh_definitions::history::OperationsHistory;
use mesh_definitions::Result;

const HISTORY_OUTPUT_KEY: &str = "operations_history";

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, stack: &str) -> Result<OperationsHistory>;
    async fn save(&self, stack: &str, history: &OperationsHistory) -> Result<()>;
}

/// Reads/writes the ledger as one opaque JSON stack output through a
/// `StateEngine`, matching how `OperationsHistory`'s own docs describe it:
/// "four bounded FIFO queues persisted as one opaque output".
pub struct StateEngineHistoryStore {
    engine: std::sync::Arc<dyn mesh_definitions::adapters::StateEngine>,
    max_entries: usize,
}

impl StateEngineHistoryStore {
    pub fn new(engine: std::sync::Arc<dyn mesh_definitions::adapters::StateEngine>, max_entries: usize) -> Self {
        StateEngineHistoryStore { engine, max_entries }
    }
}

#[async_trait::async_trait]
impl HistoryStore for StateEngineHistoryStore {
    async fn load(&self, stack: &str) -> Result<OperationsHistory> {
        use mesh_definitions::adapters::StackOutput;
        match self.engine.get_output(stack, HISTORY_OUTPUT_KEY).await? {
            Some(StackOutput::Plain(json)) => {
                let history = serde_json::from_str(&json)?;
                Ok(history)
            }
            _ => Ok(OperationsHistory::new(self.max_entries)),
        }
    }

    async fn save(&self, stack: &str, history: &OperationsHistory) -> Result<()> {
        use mesh_definitions::adapters::StackOutput;
        let json = serde_json::to_string(history)?;
        self.engine
            .set_output(stack, HISTORY_OUTPUT_KEY, StackOutput::Plain(json))
            .await
    }
}

/// In-process double for tests: keyed by stack name, no serialization.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    histories: Mutex<HashMap<String, OperationsHistory>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        InMemoryHistoryStore::default()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self, stack: &str) -> Result<OperationsHistory> {
        let histories = self.histories.lock().unwrap();
        Ok(histories.get(stack).cloned().unwrap_or_default())
    }

    async fn save(&self, stack: &str, history: &OperationsHistory) -> Result<()> {
        let mut histories = self.histories.lock().unwrap();
        histories.insert(stack.to_string(), history.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mesh_definitions::history::{HistoryEntry, HistoryStatus, OperationCategory};

    fn entry() -> HistoryEntry {
        HistoryEntry {
            id: "health-1".into(),
            timestamp: Utc::now(),
            operation: "health".into(),
            status: HistoryStatus::Success,
            payload: serde_json::json!({}),
            duration_ms: 5,
            error: None,
        }
    }

    #[tokio::test]
    async fn round_trips_through_in_memory_store() {
        let store = InMemoryHistoryStore::new();
        let mut history = store.load("c1").await.unwrap();
        let now = Utc::now();
        history.record(OperationCategory::Health, entry(), now);
        store.save("c1", &history).await.unwrap();

        let reloaded = store.load("c1").await.unwrap();
        assert_eq!(reloaded.health.len(), 1);
    }

    #[tokio::test]
    async fn unknown_stack_returns_fresh_history() {
        let store = InMemoryHistoryStore::new();
        let history = store.load("never-seen").await.unwrap();
        assert!(history.health.is_empty());
        assert!(history.backup.is_empty());
    }
}
