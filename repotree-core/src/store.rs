//! Repository list storage with change notification
//!
//! The scan result is persisted as a whole: saving replaces the stored list
//! and notifies subscribers with the new list.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::model::RepositoryRecord;
use crate::{Error, Result};

/// Buffered notifications per subscriber before old ones are dropped
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Shared list of repositories delivered to subscribers
pub type RepositoryList = Arc<Vec<RepositoryRecord>>;

/// Storage for the scanned repository list
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// The stored repositories (empty if never saved)
    async fn get_repositories(&self) -> Result<Vec<RepositoryRecord>>;

    /// Replace the stored repositories and notify subscribers
    async fn save_repositories(&self, records: Vec<RepositoryRecord>) -> Result<()>;

    /// Receive every list saved after this call
    fn subscribe(&self) -> broadcast::Receiver<RepositoryList>;
}

/// In-process store
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<Vec<RepositoryRecord>>,
    changes: broadcast::Sender<RepositoryList>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(Vec::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn get_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn save_repositories(&self, records: Vec<RepositoryRecord>) -> Result<()> {
        let list = Arc::new(records.clone());
        *self.records.write().await = records;
        // no receivers is not an error
        let _ = self.changes.send(list);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RepositoryList> {
        self.changes.subscribe()
    }
}

/// On-disk format of the JSON store
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    /// Format version for compatibility
    version: u32,
    repositories: Vec<RepositoryRecord>,
}

impl StoreFile {
    const VERSION: u32 = 1;
}

/// Store persisted as a JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    changes: broadcast::Sender<RepositoryList>,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            changes,
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RepositoryStore for JsonFileStore {
    async fn get_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Repository store not found at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: StoreFile = serde_json::from_slice(&contents)?;
        if file.version != StoreFile::VERSION {
            return Err(Error::Store(format!(
                "Unsupported store version {} in {}",
                file.version,
                self.path.display()
            )));
        }

        Ok(file.repositories)
    }

    async fn save_repositories(&self, records: Vec<RepositoryRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = StoreFile {
            version: StoreFile::VERSION,
            repositories: records,
        };
        let contents = serde_json::to_vec_pretty(&file)?;

        // write then rename so readers never see a partial file
        let temp = self.temp_path();
        tokio::fs::write(&temp, &contents).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!(
            "Saved repository list to {} ({} repos)",
            self.path.display(),
            file.repositories.len()
        );

        let _ = self.changes.send(Arc::new(file.repositories));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RepositoryList> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorktreeRecord;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(path: &str) -> RepositoryRecord {
        RepositoryRecord {
            path: PathBuf::from(path),
            name: path.rsplit('/').next().unwrap().to_string(),
            remotes: Vec::new(),
            current_branch: None,
            is_submodule: false,
            worktrees: vec![WorktreeRecord {
                name: "x".to_string(),
                path: PathBuf::from(path),
                branch: None,
                is_main: true,
                is_detached: true,
                commit_hash: Some("abc1234".to_string()),
                commit_message: None,
            }],
            last_scanned: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert!(store.get_repositories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_notifies() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();

        store.save_repositories(vec![record("/a")]).await.unwrap();

        let delivered = changes.recv().await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(store.get_repositories().await.unwrap(), *delivered);
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let store = MemoryStore::new();
        store.save_repositories(vec![record("/a"), record("/b")]).await.unwrap();
        store.save_repositories(vec![record("/c")]).await.unwrap();

        let records = store.get_repositories().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, PathBuf::from("/c"));
    }

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("repos.json"));
        assert!(store.get_repositories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("repos.json");
        let store = JsonFileStore::new(&path);
        let mut changes = store.subscribe();

        let records = vec![record("/a"), record("/b")];
        store.save_repositories(records.clone()).await.unwrap();

        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(changes.recv().await.unwrap().len(), 2);

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get_repositories().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_json_store_rejects_unknown_version() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repos.json");
        std::fs::write(&path, r#"{"version": 99, "repositories": []}"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get_repositories().await,
            Err(Error::Store(_))
        ));
    }
}
