//! In-process [`StateStore`] backed by a `tokio` `RwLock`.
//!
//! Used by tests and by store-less engine runs. Semantics match the
//! `PostgreSQL` store: optimistic versioning on save, append-only battle
//! records, newest-first history.

use std::collections::BTreeMap;

use garrison_types::{BattleId, BattleRecord, Combatant, EntityId};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<EntityId, Combatant>,
    battles: Vec<BattleRecord>,
}

/// A [`StateStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of battle records appended so far.
    pub async fn battle_count(&self) -> usize {
        self.inner.read().await.battles.len()
    }
}

impl StateStore for InMemoryStore {
    async fn get_entity(&self, id: EntityId) -> Result<Option<Combatant>, DbError> {
        Ok(self.inner.read().await.entities.get(&id).cloned())
    }

    async fn list_entities(&self) -> Result<Vec<Combatant>, DbError> {
        Ok(self.inner.read().await.entities.values().cloned().collect())
    }

    async fn list_ai_entities(&self) -> Result<Vec<Combatant>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .entities
            .values()
            .filter(|entity| entity.is_ai())
            .cloned()
            .collect())
    }

    async fn insert_entity(&self, entity: &Combatant) -> Result<(), DbError> {
        let mut inner = self.inner.write().await;
        if inner.entities.contains_key(&entity.id) {
            return Err(DbError::Duplicate(entity.id));
        }
        inner.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn save_entity(&self, entity: &Combatant) -> Result<Combatant, DbError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .entities
            .get_mut(&entity.id)
            .ok_or(DbError::NotFound(entity.id))?;
        if stored.version != entity.version {
            return Err(DbError::Conflict {
                id: entity.id,
                expected: entity.version,
                found: stored.version,
            });
        }
        let mut next = entity.clone();
        next.version = entity.version.saturating_add(1);
        *stored = next.clone();
        Ok(next)
    }

    async fn create_battle_record(&self, record: &BattleRecord) -> Result<BattleId, DbError> {
        self.inner.write().await.battles.push(record.clone());
        Ok(record.id)
    }

    async fn battle_records_for(&self, id: EntityId) -> Result<Vec<BattleRecord>, DbError> {
        let inner = self.inner.read().await;
        let mut records: Vec<BattleRecord> = inner
            .battles
            .iter()
            .filter(|record| record.attacker_id == id || record.defender_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use garrison_types::{BattleTier, ControllerKind, LoanState, Personality, Roster};
    use rust_decimal::Decimal;

    use super::*;

    fn country(controller: ControllerKind) -> Combatant {
        let now = Utc::now();
        Combatant {
            id: EntityId::new(),
            name: String::from("Memoria"),
            controller,
            personality: (controller == ControllerKind::Ai).then_some(Personality::Defensive),
            roster: Roster::new(),
            tech_level: 1,
            morale: 100.0,
            money: Decimal::from(10_000),
            buildings: BTreeMap::new(),
            loan: LoanState::default(),
            last_production_update: now,
            last_action_at: None,
            last_decision: None,
            created_at: now,
            version: 0,
        }
    }

    fn record(attacker: EntityId, defender: EntityId, minutes_ago: i64) -> BattleRecord {
        BattleRecord {
            id: BattleId::new(),
            attacker_id: attacker,
            attacker_role: ControllerKind::User,
            defender_id: defender,
            defender_role: ControllerKind::Ai,
            committed: Roster::new(),
            tier: BattleTier::Draw,
            attacker_losses: Roster::new(),
            defender_losses: Roster::new(),
            resources_stolen: BTreeMap::new(),
            attacker_power: 1.0,
            defender_power: 1.0,
            occurred_at: Utc::now() - TimeDelta::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn save_bumps_version() {
        let store = InMemoryStore::new();
        let mut entity = country(ControllerKind::User);
        store.insert_entity(&entity).await.unwrap();

        entity.money = Decimal::from(42);
        let saved = store.save_entity(&entity).await.unwrap();
        assert_eq!(saved.version, 1);

        let loaded = store.get_entity(entity.id).await.unwrap().unwrap();
        assert_eq!(loaded.money, Decimal::from(42));
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn stale_save_conflicts() {
        let store = InMemoryStore::new();
        let entity = country(ControllerKind::User);
        store.insert_entity(&entity).await.unwrap();
        store.save_entity(&entity).await.unwrap();

        let err = store.save_entity(&entity).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Conflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_and_missing_entities() {
        let store = InMemoryStore::new();
        let entity = country(ControllerKind::Ai);
        store.insert_entity(&entity).await.unwrap();
        assert!(matches!(
            store.insert_entity(&entity).await,
            Err(DbError::Duplicate(_))
        ));
        let stranger = country(ControllerKind::User);
        assert!(matches!(
            store.save_entity(&stranger).await,
            Err(DbError::NotFound(_))
        ));
        assert!(store.get_entity(stranger.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_filter_by_controller() {
        let store = InMemoryStore::new();
        store.insert_entity(&country(ControllerKind::User)).await.unwrap();
        store.insert_entity(&country(ControllerKind::Ai)).await.unwrap();
        store.insert_entity(&country(ControllerKind::Ai)).await.unwrap();

        assert_eq!(store.list_entities().await.unwrap().len(), 3);
        let ai = store.list_ai_entities().await.unwrap();
        assert_eq!(ai.len(), 2);
        assert!(ai.iter().all(Combatant::is_ai));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_scoped() {
        let store = InMemoryStore::new();
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
        let old = record(a, b, 30);
        let new = record(b, a, 5);
        let other = record(b, c, 1);
        for r in [&old, &new, &other] {
            store.create_battle_record(r).await.unwrap();
        }

        let history = store.battle_records_for(a).await.unwrap();
        let ids: Vec<BattleId> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(store.battle_count().await, 3);
    }
}
