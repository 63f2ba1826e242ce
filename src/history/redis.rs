use async_trait::async_trait;
use crate::history::{ validate_session_id, HistoryError, HistoryStore };
use log::debug;
use redis::{ Client, AsyncCommands };

pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
}

impl RedisHistoryStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, HistoryError> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn key(&self, session_id: &str) -> Result<String, HistoryError> {
        validate_session_id(session_id)?;
        Ok(format!("{}{}", self.key_prefix, session_id))
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<String>, HistoryError> {
        let key = self.key(session_id)?;
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(&key).await?;
        debug!("Loaded history key '{}' (present: {})", key, value.is_some());
        Ok(value)
    }

    async fn save(&self, session_id: &str, snapshot: &str) -> Result<(), HistoryError> {
        let key = self.key(session_id)?;
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(&key, snapshot).await?;
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), HistoryError> {
        let key = self.key(session_id)?;
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.del(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_prefix_and_reject_unsafe_sessions() {
        let store = RedisHistoryStore::new("redis://127.0.0.1:6379", "history:").unwrap();
        assert_eq!(store.key("abc").unwrap(), "history:abc");
        assert!(matches!(store.key("a:b"), Err(HistoryError::InvalidSession(_))));
    }
}
