mod file;
mod memory;
mod redis;
use async_trait::async_trait;
use log::info;
use crate::cli::ChatArgs;
use std::sync::Arc;
use thiserror::Error;

pub use self::file::FileHistoryStore;
pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("History Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Invalid session id '{0}'")]
    InvalidSession(String),
    #[error("Unsupported history store type: {0}")]
    Unsupported(String),
}

/// Durable home for serialized conversation snapshots, keyed by session.
/// Backends only ever see snapshot text, never a live conversation.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<String>, HistoryError>;

    async fn save(&self, session_id: &str, snapshot: &str) -> Result<(), HistoryError>;

    async fn remove(&self, session_id: &str) -> Result<(), HistoryError>;
}

pub fn validate_session_id(session_id: &str) -> Result<(), HistoryError> {
    let valid =
        !session_id.is_empty() &&
        session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(HistoryError::InvalidSession(session_id.to_string()))
    }
}

pub fn create_history_store(args: &ChatArgs) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match args.history_type.to_lowercase().as_str() {
        "file" => Ok(Arc::new(FileHistoryStore::new(&args.history_dir))),
        "redis" => {
            let store = RedisHistoryStore::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::default())),
        _ => Err(HistoryError::Unsupported(args.history_type.clone())),
    }
}

/// Builds the configured backend after checking the session id, so a bad
/// id fails at start-up instead of on every save.
pub fn initialize_history_store(args: &ChatArgs) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    validate_session_id(&args.session_id)?;
    let location = match args.history_type.to_lowercase().as_str() {
        "file" => args.history_dir.as_str(),
        "redis" => args.history_host.as_str(),
        _ => "process memory",
    };
    info!("Chat history will be stored in: {} at {}", args.history_type, location);
    create_history_store(args)
}
