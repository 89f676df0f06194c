//! Store doubles for failure-path tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use garrison_db::{DbError, InMemoryStore, StateStore};
use garrison_types::{BattleId, BattleRecord, Combatant, EntityId};

/// An [`InMemoryStore`] that can be told to fail or stall specific calls.
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    inner: InMemoryStore,
    failing_saves: Mutex<HashSet<EntityId>>,
    stalled_saves: Mutex<HashMap<EntityId, Duration>>,
    failing_lists: AtomicBool,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_saves_for(&self, id: EntityId) {
        self.failing_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    /// Delay every save of `id` by `delay` before it is applied.
    pub(crate) fn stall_saves_for(&self, id: EntityId, delay: Duration) {
        self.stalled_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, delay);
    }

    pub(crate) fn fail_lists(&self, fail: bool) {
        self.failing_lists.store(fail, Ordering::Release);
    }

    fn save_fails(&self, id: EntityId) -> bool {
        self.failing_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    fn injected() -> DbError {
        DbError::Config(String::from("injected failure"))
    }
}

impl StateStore for FaultyStore {
    async fn get_entity(&self, id: EntityId) -> Result<Option<Combatant>, DbError> {
        self.inner.get_entity(id).await
    }

    async fn list_entities(&self) -> Result<Vec<Combatant>, DbError> {
        if self.failing_lists.load(Ordering::Acquire) {
            return Err(Self::injected());
        }
        self.inner.list_entities().await
    }

    async fn list_ai_entities(&self) -> Result<Vec<Combatant>, DbError> {
        if self.failing_lists.load(Ordering::Acquire) {
            return Err(Self::injected());
        }
        self.inner.list_ai_entities().await
    }

    async fn insert_entity(&self, entity: &Combatant) -> Result<(), DbError> {
        self.inner.insert_entity(entity).await
    }

    async fn save_entity(&self, entity: &Combatant) -> Result<Combatant, DbError> {
        let stall = self
            .stalled_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity.id)
            .copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if self.save_fails(entity.id) {
            return Err(Self::injected());
        }
        self.inner.save_entity(entity).await
    }

    async fn create_battle_record(&self, record: &BattleRecord) -> Result<BattleId, DbError> {
        self.inner.create_battle_record(record).await
    }

    async fn battle_records_for(&self, id: EntityId) -> Result<Vec<BattleRecord>, DbError> {
        self.inner.battle_records_for(id).await
    }
}
