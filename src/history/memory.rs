use async_trait::async_trait;
use crate::history::{ HistoryError, HistoryStore };
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.entries.lock().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, snapshot: &str) -> Result<(), HistoryError> {
        self.entries.lock().await.insert(session_id.to_string(), snapshot.to_string());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), HistoryError> {
        self.entries.lock().await.remove(session_id);
        Ok(())
    }
}
