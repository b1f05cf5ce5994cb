//! In-memory standup store: no persistence, used for dry runs and tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, StandbotError};
use crate::traits::StandupStore;
use crate::types::StandupGroup;

/// Groups kept in insertion order; `save` replaces in place.
#[derive(Default)]
pub struct MemoryStore {
    groups: Mutex<Vec<StandupGroup>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: Vec<StandupGroup>) -> Self {
        Self {
            groups: Mutex::new(groups),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StandupGroup>>> {
        self.groups
            .lock()
            .map_err(|e| StandbotError::Store(format!("memory store poisoned: {e}")))
    }
}

#[async_trait]
impl StandupStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StandupGroup>> {
        Ok(self.lock()?.iter().find(|g| g.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<StandupGroup>> {
        Ok(self.lock()?.clone())
    }

    async fn save(&self, group: &StandupGroup) -> Result<()> {
        let mut groups = self.lock()?;
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group.clone(),
            None => groups.push(group.clone()),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.lock()?.retain(|g| g.id != id);
        Ok(())
    }
}
