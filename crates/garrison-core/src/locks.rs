//! Per-entity mutual exclusion.
//!
//! Every read-modify-write of a combatant runs while holding that
//! combatant's lock, so a player action and an agent decision touching the
//! same entity are serialised instead of overwriting each other. Locks on
//! different entities are independent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use garrison_types::EntityId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A table of async mutexes keyed by entity id.
#[derive(Debug, Default)]
pub struct EntityLocks {
    table: Mutex<HashMap<EntityId, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Access ends when the guard drops.
    pub async fn lock(&self, id: EntityId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(id).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of entities that have ever been locked.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no entity has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
