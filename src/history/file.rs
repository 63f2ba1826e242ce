use async_trait::async_trait;
use crate::history::{ validate_session_id, HistoryError, HistoryStore };
use log::debug;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use tokio::fs;

/// One JSON file per session under a directory.
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, HistoryError> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<String>, HistoryError> {
        let path = self.path_for(session_id)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session_id: &str, snapshot: &str) -> Result<(), HistoryError> {
        let path = self.path_for(session_id)?;
        fs::create_dir_all(&self.dir).await?;
        // readers never observe a partially written snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved history snapshot to {}", path.display());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), HistoryError> {
        let path = self.path_for(session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
