//! [`StateStore`] over `PostgreSQL`.
//!
//! Rosters, buildings, and loss maps live in `JSONB` columns; money and loan
//! principal in `NUMERIC`. Saves are a single conditional `UPDATE` on
//! `(id, version)`, so a concurrent writer can never be silently overwritten.
//!
//! Queries are built at runtime (not compile-time checked) so the workspace
//! builds without a live database. All of them are parameterized.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use garrison_types::{
    BattleId, BattleRecord, BattleTier, Combatant, ControllerKind, EntityId, LoanState, LootKind,
    MIN_TECH_LEVEL, Personality, Roster,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use crate::error::DbError;
use crate::store::StateStore;

const COMBATANT_COLUMNS: &str = "id, name, controller, personality, roster, tech_level, morale, \
     money, buildings, loan_outstanding, loan_last_issued_at, last_production_update, \
     last_action_at, last_decision, created_at, version";

const BATTLE_COLUMNS: &str = "id, attacker_id, attacker_role, defender_id, defender_role, \
     committed, tier, attacker_losses, defender_losses, resources_stolen, attacker_power, \
     defender_power, occurred_at";

/// How long a caller waits for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Entity and battle persistence on the `combatants` and `battle_records`
/// tables.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Open a pool of at most `max_connections` (at least one), apply the
    /// `combatants` / `battle_records` migrations, and report how many
    /// countries are already stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] for an unparsable URL, before any network
    /// traffic. Connection and migration failures are passed through.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;
        let max_connections = max_connections.max(1);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let (countries,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM combatants")
            .fetch_one(&pool)
            .await?;
        tracing::info!(max_connections, countries, "PostgreSQL state store ready");
        Ok(Self { pool })
    }

    /// Close every pooled connection. Later calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL state store closed");
    }

    async fn fetch_combatants(&self, filter: &str) -> Result<Vec<Combatant>, DbError> {
        let sql = format!("SELECT {COMBATANT_COLUMNS} FROM combatants {filter} ORDER BY id");
        let rows = sqlx::query_as::<_, CombatantRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(CombatantRow::into_combatant).collect()
    }
}

impl StateStore for PgStateStore {
    async fn get_entity(&self, id: EntityId) -> Result<Option<Combatant>, DbError> {
        let sql = format!("SELECT {COMBATANT_COLUMNS} FROM combatants WHERE id = $1");
        let row = sqlx::query_as::<_, CombatantRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?;
        row.map(CombatantRow::into_combatant).transpose()
    }

    async fn list_entities(&self) -> Result<Vec<Combatant>, DbError> {
        self.fetch_combatants("").await
    }

    async fn list_ai_entities(&self) -> Result<Vec<Combatant>, DbError> {
        self.fetch_combatants("WHERE controller = 'ai'").await
    }

    async fn insert_entity(&self, entity: &Combatant) -> Result<(), DbError> {
        let result = sqlx::query(
            r"INSERT INTO combatants
              (id, name, controller, personality, roster, tech_level, morale, money, buildings,
               loan_outstanding, loan_last_issued_at, last_production_update, last_action_at,
               last_decision, created_at, version)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(entity.id.into_inner())
        .bind(&entity.name)
        .bind(entity.controller.as_str())
        .bind(entity.personality.map(Personality::as_str))
        .bind(serde_json::to_value(&entity.roster)?)
        .bind(i16::from(entity.tech_level))
        .bind(entity.morale)
        .bind(entity.money)
        .bind(serde_json::to_value(&entity.buildings)?)
        .bind(entity.loan.outstanding)
        .bind(entity.loan.last_issued_at)
        .bind(entity.last_production_update)
        .bind(entity.last_action_at)
        .bind(entity.last_decision.as_deref())
        .bind(entity.created_at)
        .bind(version_to_db(entity.version))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Duplicate(entity.id));
        }
        tracing::debug!(entity_id = %entity.id, name = %entity.name, "Inserted combatant");
        Ok(())
    }

    async fn save_entity(&self, entity: &Combatant) -> Result<Combatant, DbError> {
        let updated: Option<i64> = sqlx::query_scalar(
            r"UPDATE combatants SET
                name = $3, personality = $4, roster = $5, tech_level = $6, morale = $7,
                money = $8, buildings = $9, loan_outstanding = $10, loan_last_issued_at = $11,
                last_production_update = $12, last_action_at = $13, last_decision = $14,
                version = version + 1
              WHERE id = $1 AND version = $2
              RETURNING version",
        )
        .bind(entity.id.into_inner())
        .bind(version_to_db(entity.version))
        .bind(&entity.name)
        .bind(entity.personality.map(Personality::as_str))
        .bind(serde_json::to_value(&entity.roster)?)
        .bind(i16::from(entity.tech_level))
        .bind(entity.morale)
        .bind(entity.money)
        .bind(serde_json::to_value(&entity.buildings)?)
        .bind(entity.loan.outstanding)
        .bind(entity.loan.last_issued_at)
        .bind(entity.last_production_update)
        .bind(entity.last_action_at)
        .bind(entity.last_decision.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(version) = updated {
            let mut saved = entity.clone();
            saved.version = version_from_db(version);
            return Ok(saved);
        }

        let found: Option<i64> = sqlx::query_scalar("SELECT version FROM combatants WHERE id = $1")
            .bind(entity.id.into_inner())
            .fetch_optional(&self.pool)
            .await?;
        match found {
            Some(found) => Err(DbError::Conflict {
                id: entity.id,
                expected: entity.version,
                found: version_from_db(found),
            }),
            None => Err(DbError::NotFound(entity.id)),
        }
    }

    async fn create_battle_record(&self, record: &BattleRecord) -> Result<BattleId, DbError> {
        sqlx::query(
            r"INSERT INTO battle_records
              (id, attacker_id, attacker_role, defender_id, defender_role, committed, tier,
               attacker_losses, defender_losses, resources_stolen, attacker_power,
               defender_power, occurred_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(record.id.into_inner())
        .bind(record.attacker_id.into_inner())
        .bind(record.attacker_role.as_str())
        .bind(record.defender_id.into_inner())
        .bind(record.defender_role.as_str())
        .bind(serde_json::to_value(&record.committed)?)
        .bind(record.tier.as_str())
        .bind(serde_json::to_value(&record.attacker_losses)?)
        .bind(serde_json::to_value(&record.defender_losses)?)
        .bind(serde_json::to_value(&record.resources_stolen)?)
        .bind(record.attacker_power)
        .bind(record.defender_power)
        .bind(record.occurred_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(battle_id = %record.id, tier = record.tier.as_str(), "Inserted battle record");
        Ok(record.id)
    }

    async fn battle_records_for(&self, id: EntityId) -> Result<Vec<BattleRecord>, DbError> {
        let sql = format!(
            "SELECT {BATTLE_COLUMNS} FROM battle_records \
             WHERE attacker_id = $1 OR defender_id = $1 \
             ORDER BY occurred_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, BattleRow>(&sql)
            .bind(id.into_inner())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(BattleRow::into_record).collect()
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `combatants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CombatantRow {
    /// Entity id.
    pub id: Uuid,
    /// Country name.
    pub name: String,
    /// `user` or `ai`.
    pub controller: String,
    /// Personality tag, AI only.
    pub personality: Option<String>,
    /// Roster as JSON.
    pub roster: serde_json::Value,
    /// Technology level.
    pub tech_level: i16,
    /// Morale percentage.
    pub morale: f64,
    /// Treasury balance.
    pub money: Decimal,
    /// Buildings as JSON.
    pub buildings: serde_json::Value,
    /// Outstanding loan principal.
    pub loan_outstanding: Decimal,
    /// Last loan issuance.
    pub loan_last_issued_at: Option<DateTime<Utc>>,
    /// Last production credit.
    pub last_production_update: DateTime<Utc>,
    /// Last agent action.
    pub last_action_at: Option<DateTime<Utc>>,
    /// Last agent decision.
    pub last_decision: Option<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token.
    pub version: i64,
}

impl CombatantRow {
    /// Map the row back into a [`Combatant`].
    pub fn into_combatant(self) -> Result<Combatant, DbError> {
        let roster: Roster = serde_json::from_value(self.roster)?;
        let buildings: BTreeMap<String, u32> = serde_json::from_value(self.buildings)?;
        let tech_level = u8::try_from(self.tech_level).unwrap_or(MIN_TECH_LEVEL);

        let mut combatant = Combatant {
            id: EntityId::from(self.id),
            name: self.name,
            controller: ControllerKind::parse(&self.controller),
            personality: self.personality.as_deref().map(Personality::from_tag),
            roster,
            tech_level,
            morale: self.morale,
            money: self.money,
            buildings,
            loan: LoanState {
                outstanding: self.loan_outstanding,
                last_issued_at: self.loan_last_issued_at,
            },
            last_production_update: self.last_production_update,
            last_action_at: self.last_action_at,
            last_decision: self.last_decision,
            created_at: self.created_at,
            version: version_from_db(self.version),
        };
        combatant.set_tech_level(tech_level);
        combatant.set_morale(self.morale);
        Ok(combatant)
    }
}

/// A row from the `battle_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BattleRow {
    /// Record id.
    pub id: Uuid,
    /// Attacking entity.
    pub attacker_id: Uuid,
    /// `user` or `ai`.
    pub attacker_role: String,
    /// Defending entity.
    pub defender_id: Uuid,
    /// `user` or `ai`.
    pub defender_role: String,
    /// Committed attacker forces as JSON.
    pub committed: serde_json::Value,
    /// Outcome tier tag.
    pub tier: String,
    /// Attacker losses as JSON.
    pub attacker_losses: serde_json::Value,
    /// Defender losses as JSON.
    pub defender_losses: serde_json::Value,
    /// Stolen resources as JSON.
    pub resources_stolen: serde_json::Value,
    /// Final attacker power.
    pub attacker_power: f64,
    /// Final defender power.
    pub defender_power: f64,
    /// When the engagement was resolved.
    pub occurred_at: DateTime<Utc>,
}

impl BattleRow {
    /// Map the row back into a [`BattleRecord`].
    pub fn into_record(self) -> Result<BattleRecord, DbError> {
        let tier = BattleTier::parse(&self.tier)
            .ok_or_else(|| DbError::Corrupt(format!("unknown battle tier {:?}", self.tier)))?;
        let resources_stolen: BTreeMap<LootKind, Decimal> =
            serde_json::from_value(self.resources_stolen)?;
        Ok(BattleRecord {
            id: BattleId::from(self.id),
            attacker_id: EntityId::from(self.attacker_id),
            attacker_role: ControllerKind::parse(&self.attacker_role),
            defender_id: EntityId::from(self.defender_id),
            defender_role: ControllerKind::parse(&self.defender_role),
            committed: serde_json::from_value(self.committed)?,
            tier,
            attacker_losses: serde_json::from_value(self.attacker_losses)?,
            defender_losses: serde_json::from_value(self.defender_losses)?,
            resources_stolen,
            attacker_power: self.attacker_power,
            defender_power: self.defender_power,
            occurred_at: self.occurred_at,
        })
    }
}

fn version_to_db(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn version_from_db(version: i64) -> u64 {
    u64::try_from(version).unwrap_or(0)
}
