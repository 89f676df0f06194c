//! Battle settlement: resolve an engagement and commit its effects.
//!
//! ## Commit order
//!
//! 1. Resolve against snapshots of both entities (pure).
//! 2. Attacker: apply its losses and add the plunder, under its own lock.
//! 3. Defender: apply its losses and remove the plunder, capped at its
//!    treasury, under its own lock.
//! 4. Append the battle record with the amount actually taken.
//!
//! The two entity updates are independent atomic commits and no lock is
//! ever held on both entities at once. If step 3 fails after step 2
//! succeeded, the attacker keeps its update, the record is discarded, and
//! the inconsistency is logged at `error`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use garrison_combat::{CombatStats, resolve_battle_with_luck};
use garrison_db::StateStore;
use garrison_types::{BattleId, BattleRecord, Combatant, EntityId, LootKind, Roster};
use rust_decimal::Decimal;

use crate::error::GameError;
use crate::service::GameService;

impl<S: StateStore> GameService<S> {
    /// Attack `defender_id` with a subset of `attacker_id`'s forces.
    ///
    /// `defending` restricts the defender to an explicit subset of its
    /// roster; when `None` the whole roster defends.
    pub async fn launch_attack(
        &self,
        attacker_id: EntityId,
        defender_id: EntityId,
        committed: Roster,
        defending: Option<Roster>,
        now: DateTime<Utc>,
    ) -> Result<BattleRecord, GameError> {
        if attacker_id == defender_id {
            return Err(GameError::Validation(String::from("a country cannot attack itself")));
        }
        let attacker = self.entity(attacker_id).await?;
        let defender = self.entity(defender_id).await?;

        let committed = committed.compacted();
        if committed.is_empty() {
            return Err(GameError::Validation(String::from("no units committed")));
        }
        if !attacker.roster.covers(&committed) {
            return Err(GameError::Validation(String::from(
                "committed forces exceed the units held",
            )));
        }
        let defending = match defending {
            Some(subset) => {
                let subset = subset.compacted();
                if !defender.roster.covers(&subset) {
                    return Err(GameError::Validation(String::from(
                        "defending forces exceed the units held",
                    )));
                }
                subset
            }
            None => defender.roster.clone(),
        };

        let outcome = resolve_battle_with_luck(
            self.catalog(),
            &committed,
            &CombatStats::of(&attacker),
            &defending,
            &CombatStats::of(&defender),
            self.roll_luck(),
        )?;
        let plunder = outcome.stolen(LootKind::Money);

        // Attacker first.
        self.mutate(attacker_id, |entity| {
            entity.roster.apply_losses(&outcome.attacker_losses);
            entity.money = entity
                .money
                .checked_add(plunder)
                .ok_or_else(|| GameError::Validation(String::from("treasury overflow")))?;
            Ok(())
        })
        .await?;

        // Then defender.
        let defender_commit = self
            .mutate(defender_id, |entity| {
                entity.roster.apply_losses(&outcome.defender_losses);
                Ok(debit_plunder(entity, plunder))
            })
            .await;
        let taken = match defender_commit {
            Ok((_, taken)) => taken,
            Err(err) => {
                tracing::error!(
                    attacker_id = %attacker_id,
                    defender_id = %defender_id,
                    tier = outcome.tier.as_str(),
                    error = %err,
                    "Defender update failed after attacker commit; battle record discarded"
                );
                return Err(err);
            }
        };
        if taken < plunder {
            tracing::warn!(
                attacker_id = %attacker_id,
                defender_id = %defender_id,
                credited = %plunder,
                taken = %taken,
                "Defender treasury shrank before settlement; attacker credited more than was taken"
            );
        }
        let mut resources_stolen = BTreeMap::new();
        if taken > Decimal::ZERO {
            resources_stolen.insert(LootKind::Money, taken);
        }

        let record = BattleRecord {
            id: BattleId::new(),
            attacker_id,
            attacker_role: attacker.controller,
            defender_id,
            defender_role: defender.controller,
            committed,
            tier: outcome.tier,
            attacker_losses: outcome.attacker_losses,
            defender_losses: outcome.defender_losses,
            resources_stolen,
            attacker_power: outcome.attacker_power,
            defender_power: outcome.defender_power,
            occurred_at: now,
        };
        self.bounded("create_battle_record", self.store().create_battle_record(&record))
            .await?;

        tracing::info!(
            battle_id = %record.id,
            attacker = %attacker.name,
            defender = %defender.name,
            tier = record.tier.as_str(),
            attacker_won = record.tier.is_attacker_victory(),
            plunder = %plunder,
            "Battle settled"
        );
        Ok(record)
    }
}

/// Remove up to `plunder` from the defender's treasury, never taking it
/// below zero. Returns the amount removed.
fn debit_plunder(defender: &mut Combatant, plunder: Decimal) -> Decimal {
    let taken = plunder.min(defender.money).max(Decimal::ZERO);
    defender.money = defender.money.checked_sub(taken).unwrap_or(defender.money);
    taken
}
