//! File-based standup store: every group in one pretty-printed JSON file.
//! Human-readable and easy to hand-edit; rewritten on every save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use standbot_core::error::{Result, StandbotError};
use standbot_core::traits::StandupStore;
use standbot_core::types::StandupGroup;
use tokio::sync::Mutex;

/// JSON file standup store.
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by `path`; the file appears on first save.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<Vec<StandupGroup>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| StandbotError::Store(format!("Read error: {e}")))?;
        serde_json::from_str(&json).map_err(|e| {
            StandbotError::Store(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write(&self, groups: &[StandupGroup]) -> Result<()> {
        let json = serde_json::to_string_pretty(groups)
            .map_err(|e| StandbotError::Store(format!("Serialize error: {e}")))?;
        // Write beside the real file, then swap it in; a crash leaves the old file intact.
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| StandbotError::Store(format!("Write error: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StandbotError::Store(format!("Rename error: {e}")))?;
        tracing::debug!("💾 Saved {} standups to {}", groups.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl StandupStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StandupGroup>> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.into_iter().find(|g| g.id == id))
    }

    async fn find_all(&self) -> Result<Vec<StandupGroup>> {
        let _guard = self.lock.lock().await;
        self.load()
    }

    async fn save(&self, group: &StandupGroup) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut groups = self.load()?;
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group.clone(),
            None => groups.push(group.clone()),
        }
        self.write(&groups)
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut groups = self.load()?;
        let before = groups.len();
        groups.retain(|g| g.id != id);
        if groups.len() != before {
            self.write(&groups)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(&dir.path().join("standups.json")).unwrap();
        assert!(store.find_all().await.unwrap().is_empty());
        assert!(store.find_by_id("g1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replace_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("standups.json");
        let store = JsonFileStore::new(&path).unwrap();

        let mut a = StandupGroup::new("a", "chan-a");
        a.add_member("u2");
        a.add_member("u1");
        store.save(&a).await.unwrap();
        store.save(&StandupGroup::new("b", "chan-b")).await.unwrap();

        a.responses.insert("u1".into(), "did things".into());
        store.save(&a).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], a);
        assert_eq!(all[0].members, vec!["u2", "u1"]);

        // Survives reopening
        let reopened = JsonFileStore::new(&path).unwrap();
        assert_eq!(reopened.find_by_id("a").await.unwrap(), Some(a));

        reopened.delete_by_id("a").await.unwrap();
        let ids: Vec<String> = reopened
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standups.json");
        let store = JsonFileStore::new(&path).unwrap();

        // A stale temp file from an interrupted write is simply overwritten.
        std::fs::write(dir.path().join("standups.json.tmp"), "{ half").unwrap();
        store.save(&StandupGroup::new("a", "chan-a")).await.unwrap();
        store.save(&StandupGroup::new("b", "chan-b")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["standups.json"]);

        let on_disk: Vec<StandupGroup> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standups.json");
        std::fs::write(&path, "{ nope").unwrap();
        let store = JsonFileStore::new(&path).unwrap();
        assert!(matches!(
            store.find_all().await,
            Err(StandbotError::Store(_))
        ));
    }
}
