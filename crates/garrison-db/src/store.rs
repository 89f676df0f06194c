//! The [`StateStore`] contract shared by every backend.

use std::future::Future;

use garrison_types::{BattleId, BattleRecord, Combatant, EntityId};

use crate::error::DbError;

/// Entity and battle-record persistence.
///
/// Every method is atomic on its own. `save_entity` is additionally guarded
/// by the entity's `version`: a save succeeds only if the stored version
/// still equals the version the caller loaded, and the stored version is
/// then incremented. Callers serialise their own read-modify-write cycles
/// per entity; the version check catches any writer that does not.
pub trait StateStore: Send + Sync + 'static {
    /// Fetch one entity, `None` if it does not exist.
    fn get_entity(
        &self,
        id: EntityId,
    ) -> impl Future<Output = Result<Option<Combatant>, DbError>> + Send;

    /// Every registered entity, ordered by id.
    fn list_entities(&self) -> impl Future<Output = Result<Vec<Combatant>, DbError>> + Send;

    /// Every AI-controlled entity, ordered by id.
    fn list_ai_entities(&self) -> impl Future<Output = Result<Vec<Combatant>, DbError>> + Send;

    /// Insert a newly registered entity.
    ///
    /// Fails with [`DbError::Duplicate`] if the id is taken.
    fn insert_entity(&self, entity: &Combatant) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Persist a modified entity and return it with its new version.
    ///
    /// Fails with [`DbError::Conflict`] on a version mismatch and
    /// [`DbError::NotFound`] if the entity was never inserted.
    fn save_entity(
        &self,
        entity: &Combatant,
    ) -> impl Future<Output = Result<Combatant, DbError>> + Send;

    /// Append an immutable battle record.
    fn create_battle_record(
        &self,
        record: &BattleRecord,
    ) -> impl Future<Output = Result<BattleId, DbError>> + Send;

    /// Records in which `id` was attacker or defender, newest first.
    fn battle_records_for(
        &self,
        id: EntityId,
    ) -> impl Future<Output = Result<Vec<BattleRecord>, DbError>> + Send;
}
