//! [`GameService`]: the operations exposed to front-end collaborators and
//! used by the agent scheduler.
//!
//! Every mutation goes through [`GameService::mutate`], which holds the
//! entity's lock across load, rule application, and save. Rules themselves
//! live in the combat and ledger crates and are pure.
//!
//! Each store call is bounded by `infrastructure.store_timeout_ms`. Callers
//! are never cancelled as a whole, so a multi-step operation such as battle
//! settlement always reaches its own failure handling.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use garrison_combat::{BattleOutcome, CombatStats, Luck, UnitCatalog, resolve_battle_with_luck};
use garrison_db::{DbError, StateStore};
use garrison_ledger::LoanPolicy;
use garrison_types::{
    BattleRecord, Combatant, ControllerKind, EntityId, Personality, Roster, UnitCategory,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use crate::config::GameConfig;
use crate::error::{ActionReply, GameError};
use crate::locks::EntityLocks;
use crate::registration::new_combatant;

/// Game operations over a [`StateStore`].
pub struct GameService<S> {
    store: Arc<S>,
    catalog: UnitCatalog,
    locks: EntityLocks,
    loan_policy: LoanPolicy,
    initial_money: Decimal,
    store_timeout: Duration,
    rng: Mutex<StdRng>,
}

impl<S: StateStore> GameService<S> {
    /// Build a service from configuration.
    ///
    /// Luck is drawn from a generator seeded with `scheduler.seed` when set,
    /// otherwise from OS entropy.
    pub fn new(store: Arc<S>, config: &GameConfig) -> Self {
        let rng = config
            .scheduler
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            store,
            catalog: config.unit_catalog(),
            locks: EntityLocks::new(),
            loan_policy: config.economy.loan_policy(),
            initial_money: Decimal::from(config.economy.initial_money),
            store_timeout: config.infrastructure.store_timeout(),
            rng: Mutex::new(rng),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The unit catalog in effect.
    pub const fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// The loan limits in effect.
    pub const fn loan_policy(&self) -> &LoanPolicy {
        &self.loan_policy
    }

    /// Atomically load, modify, and save one entity.
    ///
    /// `apply` runs on a fresh copy under the entity's lock. If it fails,
    /// nothing is written. Returns the saved entity and `apply`'s value.
    pub async fn mutate<T, F>(&self, id: EntityId, apply: F) -> Result<(Combatant, T), GameError>
    where
        F: FnOnce(&mut Combatant) -> Result<T, GameError> + Send,
        T: Send,
    {
        let _guard = self.locks.lock(id).await;
        let mut entity = self.entity(id).await?;
        let value = apply(&mut entity)?;
        let saved = self
            .bounded("save_entity", self.store.save_entity(&entity))
            .await?;
        Ok((saved, value))
    }

    /// Await one store call under the store deadline.
    pub(crate) async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DbError>> + Send,
    ) -> Result<T, GameError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                let after_ms = u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(operation, after_ms, "Store call timed out");
                Err(GameError::Persistence(DbError::Timeout {
                    operation,
                    after_ms,
                }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Registration and queries
    // -----------------------------------------------------------------------

    /// Register a new country with the seeded starting holdings.
    pub async fn register(
        &self,
        name: &str,
        controller: ControllerKind,
        personality: Option<Personality>,
        now: DateTime<Utc>,
    ) -> Result<Combatant, GameError> {
        if name.trim().is_empty() {
            return Err(GameError::Validation(String::from("country name is empty")));
        }
        let entity = new_combatant(name, controller, personality, self.initial_money, now);
        self.bounded("insert_entity", self.store.insert_entity(&entity))
            .await?;
        tracing::info!(
            entity_id = %entity.id,
            name = %entity.name,
            controller = entity.controller.as_str(),
            personality = entity.personality.map(Personality::as_str),
            "Country registered"
        );
        Ok(entity)
    }

    /// Load one entity.
    pub async fn entity(&self, id: EntityId) -> Result<Combatant, GameError> {
        self.bounded("get_entity", self.store.get_entity(id))
            .await?
            .ok_or(GameError::EntityNotFound(id))
    }

    /// Every registered country.
    pub async fn entities(&self) -> Result<Vec<Combatant>, GameError> {
        self.bounded("list_entities", self.store.list_entities()).await
    }

    /// Every AI-controlled country.
    pub async fn ai_entities(&self) -> Result<Vec<Combatant>, GameError> {
        self.bounded("list_ai_entities", self.store.list_ai_entities())
            .await
    }

    /// Every battle `id` fought, newest first.
    pub async fn battle_history(&self, id: EntityId) -> Result<Vec<BattleRecord>, GameError> {
        self.bounded("battle_records_for", self.store.battle_records_for(id))
            .await
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// Daily production of an entity at its current tech level and morale.
    pub async fn compute_production(&self, id: EntityId) -> Result<u64, GameError> {
        let entity = self.entity(id).await?;
        Ok(garrison_ledger::compute_daily_production(&entity)?)
    }

    /// Credit production accrued up to `now`. Returns the amount credited.
    pub async fn accrue(&self, id: EntityId, now: DateTime<Utc>) -> Result<u64, GameError> {
        let (_, credited) = self
            .mutate(id, |entity| Ok(garrison_ledger::apply_accrual(entity, now)?))
            .await?;
        Ok(credited)
    }

    // -----------------------------------------------------------------------
    // Credit
    // -----------------------------------------------------------------------

    /// Issue a loan, surfacing any error to the caller.
    pub async fn try_issue_loan(
        &self,
        id: EntityId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Combatant, GameError> {
        let policy = self.loan_policy;
        let (entity, ()) = self
            .mutate(id, |entity| {
                Ok(garrison_ledger::issue_loan(entity, amount, now, &policy)?)
            })
            .await?;
        Ok(entity)
    }

    /// Issue a loan and report the outcome as an [`ActionReply`].
    pub async fn issue_loan(&self, id: EntityId, amount: Decimal, now: DateTime<Utc>) -> ActionReply {
        match self.try_issue_loan(id, amount, now).await {
            Ok(entity) => ActionReply::success(format!(
                "Loan of {amount} granted. Outstanding debt: {}.",
                entity.loan.outstanding
            )),
            Err(err) => reply_failure(id, &err),
        }
    }

    /// Repay part of a loan, surfacing any error to the caller.
    pub async fn try_repay_loan(&self, id: EntityId, amount: Decimal) -> Result<Combatant, GameError> {
        let (entity, ()) = self
            .mutate(id, |entity| Ok(garrison_ledger::repay_loan(entity, amount)?))
            .await?;
        Ok(entity)
    }

    /// Repay part of a loan and report the outcome as an [`ActionReply`].
    pub async fn repay_loan(&self, id: EntityId, amount: Decimal) -> ActionReply {
        match self.try_repay_loan(id, amount).await {
            Ok(entity) => ActionReply::success(format!(
                "Repaid {amount}. Outstanding debt: {}.",
                entity.loan.outstanding
            )),
            Err(err) => reply_failure(id, &err),
        }
    }

    // -----------------------------------------------------------------------
    // Military
    // -----------------------------------------------------------------------

    /// Buy units from the catalog. Returns the entity after the purchase.
    pub async fn purchase_units(
        &self,
        id: EntityId,
        category: UnitCategory,
        unit: &str,
        count: u32,
    ) -> Result<Combatant, GameError> {
        let spec = *self.catalog.spec(category, unit)?;
        let (entity, _) = self
            .mutate(id, |entity| {
                Ok(garrison_ledger::purchase_units(entity, category, unit, count, &spec)?)
            })
            .await?;
        Ok(entity)
    }

    /// Resolve an engagement without touching any state.
    pub fn resolve_battle(
        &self,
        attacker_roster: &Roster,
        attacker: &CombatStats,
        defender_roster: &Roster,
        defender: &CombatStats,
    ) -> Result<BattleOutcome, GameError> {
        let luck = self.roll_luck();
        Ok(resolve_battle_with_luck(
            &self.catalog,
            attacker_roster,
            attacker,
            defender_roster,
            defender,
            luck,
        )?)
    }

    /// Record an agent decision on an entity.
    pub async fn record_action(
        &self,
        id: EntityId,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<Combatant, GameError> {
        let (entity, ()) = self
            .mutate(id, |entity| {
                entity.record_action(description, now);
                Ok(())
            })
            .await?;
        Ok(entity)
    }

    pub(crate) fn roll_luck(&self) -> Luck {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Luck::roll(&mut *rng)
    }
}

fn reply_failure(id: EntityId, err: &GameError) -> ActionReply {
    if err.is_user_facing() {
        tracing::debug!(entity_id = %id, error = %err, "Action rejected");
    } else {
        tracing::warn!(entity_id = %id, error = %err, "Action failed");
    }
    ActionReply::failure(err)
}
