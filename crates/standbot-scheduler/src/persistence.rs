//! SQLite-backed persistence for standup groups.
//! Members and responses are stored as JSON columns on one row per group.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use standbot_core::error::{Result, StandbotError};
use standbot_core::traits::StandupStore;
use standbot_core::types::StandupGroup;

/// SQLite standup store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the standup database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| StandbotError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    /// Throwaway database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StandbotError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS standups (
                id TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL,
                members TEXT NOT NULL DEFAULT '[]',     -- JSON array, insertion order
                responses TEXT NOT NULL DEFAULT '{}',   -- JSON object member_id -> text
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
         ",
            )
            .map_err(|e| StandbotError::Store(format!("Migration: {e}")))
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StandbotError::Store(format!("DB lock poisoned: {e}")))
    }
}

/// Raw row; JSON columns decoded separately so one bad row can be skipped.
struct StandupRow {
    id: String,
    channel_id: String,
    members: String,
    responses: String,
}

impl StandupRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            channel_id: row.get(1)?,
            members: row.get(2)?,
            responses: row.get(3)?,
        })
    }

    fn decode(self) -> Result<StandupGroup> {
        let members: Vec<String> = serde_json::from_str(&self.members)?;
        let responses: BTreeMap<String, String> = serde_json::from_str(&self.responses)?;
        Ok(StandupGroup {
            id: self.id,
            delivery_channel: self.channel_id,
            members,
            responses,
        })
    }
}

#[async_trait]
impl StandupStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StandupGroup>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT id, channel_id, members, responses FROM standups WHERE id = ?1",
                [id],
                StandupRow::from_row,
            )
            .optional()
            .map_err(|e| StandbotError::Store(format!("Find standup: {e}")))?;
        row.map(StandupRow::decode).transpose()
    }

    async fn find_all(&self) -> Result<Vec<StandupGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, channel_id, members, responses FROM standups ORDER BY created_at, rowid",
            )
            .map_err(|e| StandbotError::Store(format!("Find standups: {e}")))?;
        let rows = stmt
            .query_map([], StandupRow::from_row)
            .map_err(|e| StandbotError::Store(format!("Find standups: {e}")))?;

        let mut groups = Vec::new();
        for row in rows {
            let row = row.map_err(|e| StandbotError::Store(format!("Read standup: {e}")))?;
            let id = row.id.clone();
            match row.decode() {
                Ok(group) => groups.push(group),
                Err(e) => tracing::warn!("⚠️ Skipping unreadable standup {id}: {e}"),
            }
        }
        Ok(groups)
    }

    async fn save(&self, group: &StandupGroup) -> Result<()> {
        let members = serde_json::to_string(&group.members)?;
        let responses = serde_json::to_string(&group.responses)?;
        let now = Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT INTO standups (id, channel_id, members, responses, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    channel_id = excluded.channel_id,
                    members = excluded.members,
                    responses = excluded.responses,
                    updated_at = excluded.updated_at",
                params![group.id, group.delivery_channel, members, responses, now],
            )
            .map_err(|e| StandbotError::Store(format!("Save standup: {e}")))?;
        tracing::debug!("💾 Saved standup {}", group.id);
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM standups WHERE id = ?1", [id])
            .map_err(|e| StandbotError::Store(format!("Delete standup: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, members: &[&str]) -> StandupGroup {
        let mut g = StandupGroup::new(id, format!("chan-{id}"));
        for m in members {
            g.add_member(m);
        }
        g
    }

    #[tokio::test]
    async fn test_open_and_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("data").join("test.db")).unwrap();
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_keeps_member_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut g = group("g1", &["zed", "amy", "max"]);
        g.responses.insert("amy".into(), "line1\nline2".into());
        store.save(&g).await.unwrap();

        let loaded = store.find_by_id("g1").await.unwrap().unwrap();
        assert_eq!(loaded, g);
        assert!(store.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_updates_without_reordering() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&group("first", &[])).await.unwrap();
        store.save(&group("second", &[])).await.unwrap();

        let mut first = group("first", &["u1"]);
        first.responses.insert("u1".into(), "hi".into());
        store.save(&first).await.unwrap();

        let all = store.find_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(all[0].response("u1"), Some("hi"));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&group("g1", &["u1"])).await.unwrap();
        store.delete_by_id("g1").await.unwrap();
        assert!(store.find_by_id("g1").await.unwrap().is_none());
        // deleting twice is fine
        store.delete_by_id("g1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_row_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&group("good", &["u1"])).await.unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO standups (id, channel_id, members, responses, created_at, updated_at)
                 VALUES ('bad', 'c', 'not json', '{}', 'z', 'z')",
                [],
            )
            .unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(store.find_by_id("bad").await.is_err());
    }
}
