//! # Standbot Scheduler
//!
//! The daily summary trigger and the stores that keep standups between runs.
//!
//! ## Architecture
//! ```text
//! spawn_scheduler (tokio sleep until next cron match)
//!   └── SchedulerEngine::run_cycle
//!         ├── StandupStore::find_all
//!         └── per group, concurrently:
//!               aggregate → resolve channel → send embeds → re-read and clear delivered
//!
//! Stores
//!   ├── SqliteStore   (default, ~/.standbot/standbot.db)
//!   ├── JsonFileStore (single JSON file)
//!   └── MemoryStore   (standbot-core, nothing persisted)
//! ```

pub mod cron;
pub mod engine;
pub mod persistence;
pub mod store;

use std::sync::Arc;

use standbot_core::config::StoreConfig;
use standbot_core::error::{Result, StandbotError};
use standbot_core::memory::MemoryStore;
use standbot_core::traits::StandupStore;

pub use cron::{CronSchedule, next_run_from_cron};
pub use engine::{CycleReport, GroupOutcome, GroupReport, SchedulerEngine, spawn_scheduler};
pub use persistence::SqliteStore;
pub use store::JsonFileStore;

/// Open the store named by `config.backend`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn StandupStore>> {
    let store: Arc<dyn StandupStore> = match config.backend.as_str() {
        "sqlite" => Arc::new(SqliteStore::open(&config.expanded_path())?),
        "json" => Arc::new(JsonFileStore::new(&config.expanded_path())?),
        "memory" => Arc::new(MemoryStore::new()),
        other => {
            return Err(StandbotError::Config(format!(
                "unknown store backend '{other}'"
            )));
        }
    };
    tracing::info!("Standup store: {} ({})", store.name(), config.path);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_backends() {
        let dir = tempfile::tempdir().unwrap();
        for (backend, file) in [("sqlite", "s.db"), ("json", "s.json"), ("memory", "")] {
            let config = StoreConfig {
                backend: backend.into(),
                path: dir.path().join(file).to_string_lossy().into_owned(),
            };
            let store = open_store(&config).unwrap();
            assert_eq!(store.name(), backend);
            assert!(store.find_all().await.unwrap().is_empty());
        }
    }

    #[test]
    fn test_open_store_unknown_backend() {
        let config = StoreConfig {
            backend: "redis".into(),
            path: String::new(),
        };
        assert!(open_store(&config).is_err());
    }
}
