//! Core data contracts: rosters, combatants, loans, and battle records.
//!
//! These are the shapes persisted by the state store and exchanged with
//! front-end collaborators. Mutation rules live in the combat and ledger
//! crates; this module only guards the value-level invariants (counts never
//! negative, morale and tech level clamped).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BattleTier, CombatRole, ControllerKind, LootKind, Personality, UnitCategory};
use crate::ids::{BattleId, EntityId};

/// Lowest technology level a combatant can hold.
pub const MIN_TECH_LEVEL: u8 = 1;

/// Highest technology level a combatant can hold.
pub const MAX_TECH_LEVEL: u8 = 10;

/// Morale ceiling (percent).
pub const MAX_MORALE: f64 = 100.0;

// ---------------------------------------------------------------------------
// UnitSpec
// ---------------------------------------------------------------------------

/// Static stats of a single unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitSpec {
    /// Power contributed per unit when attacking.
    pub attack: u32,
    /// Power contributed per unit when defending.
    pub defense: u32,
    /// Purchase price per unit.
    pub price: u32,
}

impl UnitSpec {
    /// The stat that counts for the given role.
    pub const fn value(&self, role: CombatRole) -> u32 {
        match role {
            CombatRole::Attack => self.attack,
            CombatRole::Defense => self.defense,
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Military holdings: category -> unit name -> count.
///
/// Counts are unsigned and every subtraction saturates, so no operation can
/// drive a count below zero. Names are validated against the unit catalog
/// by the combat crate, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Roster(BTreeMap<UnitCategory, BTreeMap<String, u32>>);

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert, replacing any previous count.
    #[must_use]
    pub fn with(mut self, category: UnitCategory, unit: &str, count: u32) -> Self {
        self.set(category, unit, count);
        self
    }

    /// Count held of one unit, zero when absent.
    pub fn count(&self, category: UnitCategory, unit: &str) -> u32 {
        self.0
            .get(&category)
            .and_then(|units| units.get(unit))
            .copied()
            .unwrap_or(0)
    }

    /// Set the count of one unit.
    pub fn set(&mut self, category: UnitCategory, unit: &str, count: u32) {
        self.0
            .entry(category)
            .or_default()
            .insert(unit.to_owned(), count);
    }

    /// Raise a unit count, saturating at `u32::MAX`. Returns the new count.
    pub fn add(&mut self, category: UnitCategory, unit: &str, amount: u32) -> u32 {
        let slot = self
            .0
            .entry(category)
            .or_default()
            .entry(unit.to_owned())
            .or_insert(0);
        *slot = slot.saturating_add(amount);
        *slot
    }

    /// Lower a unit count, saturating at zero. Returns how many were
    /// actually removed.
    pub fn remove(&mut self, category: UnitCategory, unit: &str, amount: u32) -> u32 {
        let Some(slot) = self.0.get_mut(&category).and_then(|units| units.get_mut(unit)) else {
            return 0;
        };
        let removed = amount.min(*slot);
        *slot = slot.saturating_sub(removed);
        removed
    }

    /// Subtract every count in `losses` from this roster (saturating).
    pub fn apply_losses(&mut self, losses: &Self) {
        for (category, unit, lost) in losses.iter() {
            self.remove(category, unit, lost);
        }
    }

    /// Categories that have at least one entry (possibly zero-count).
    pub fn categories(&self) -> impl Iterator<Item = UnitCategory> + '_ {
        self.0.keys().copied()
    }

    /// Every `(category, unit, count)` entry, including zero counts.
    pub fn iter(&self) -> impl Iterator<Item = (UnitCategory, &str, u32)> + '_ {
        self.0.iter().flat_map(|(&category, units)| {
            units
                .iter()
                .map(move |(unit, &count)| (category, unit.as_str(), count))
        })
    }

    /// Sum of all unit counts.
    pub fn total_units(&self) -> u64 {
        self.iter()
            .fold(0_u64, |acc, (_, _, count)| acc.saturating_add(u64::from(count)))
    }

    /// True when no unit has a positive count.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, _, count)| count == 0)
    }

    /// True when this roster holds at least every count in `subset`.
    pub fn covers(&self, subset: &Self) -> bool {
        subset
            .iter()
            .all(|(category, unit, count)| self.count(category, unit) >= count)
    }

    /// Drop zero-count entries and empty categories.
    #[must_use]
    pub fn compacted(mut self) -> Self {
        for units in self.0.values_mut() {
            units.retain(|_, count| *count > 0);
        }
        self.0.retain(|_, units| !units.is_empty());
        self
    }
}

// ---------------------------------------------------------------------------
// LoanState
// ---------------------------------------------------------------------------

/// Credit position embedded in a combatant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoanState {
    /// Principal still owed.
    #[ts(as = "String")]
    pub outstanding: Decimal,
    /// When the most recent loan was issued, if ever.
    pub last_issued_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Combatant
// ---------------------------------------------------------------------------

/// A country in the game, human- or AI-controlled.
///
/// Created on registration and never deleted. `version` is the optimistic
/// concurrency token checked by the state store on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Combatant {
    /// Stable identity.
    pub id: EntityId,
    /// Country name shown to players.
    pub name: String,
    /// Human player or autonomous agent.
    pub controller: ControllerKind,
    /// Temperament driving AI decisions. `None` for human players.
    pub personality: Option<Personality>,
    /// Military holdings.
    pub roster: Roster,
    /// Technology level, 1 through 10.
    pub tech_level: u8,
    /// Morale percentage, 0 through 100.
    pub morale: f64,
    /// Treasury balance.
    #[ts(as = "String")]
    pub money: Decimal,
    /// Buildings held: building name -> count.
    pub buildings: BTreeMap<String, u32>,
    /// Credit position.
    pub loan: LoanState,
    /// Last time production was credited to the treasury.
    pub last_production_update: DateTime<Utc>,
    /// Last time the agent scheduler acted for this entity.
    pub last_action_at: Option<DateTime<Utc>>,
    /// Human-readable description of the last agent decision.
    pub last_decision: Option<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token.
    pub version: u64,
}

impl Combatant {
    /// Whether the agent scheduler drives this entity.
    pub fn is_ai(&self) -> bool {
        self.controller == ControllerKind::Ai
    }

    /// Set the technology level, clamped to `1..=10`.
    pub fn set_tech_level(&mut self, level: u8) {
        self.tech_level = level.clamp(MIN_TECH_LEVEL, MAX_TECH_LEVEL);
    }

    /// Set morale, clamped to `0..=100`. NaN becomes zero.
    pub fn set_morale(&mut self, morale: f64) {
        self.morale = if morale.is_nan() {
            0.0
        } else {
            morale.clamp(0.0, MAX_MORALE)
        };
    }

    /// Record an agent decision and advance the last-action timestamp.
    pub fn record_action(&mut self, description: String, now: DateTime<Utc>) {
        self.last_decision = Some(description);
        self.last_action_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// BattleRecord
// ---------------------------------------------------------------------------

/// Immutable record of one resolved engagement. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BattleRecord {
    /// Record identity.
    pub id: BattleId,
    /// The attacking entity.
    pub attacker_id: EntityId,
    /// Whether the attacker is a user or an AI.
    pub attacker_role: ControllerKind,
    /// The defending entity.
    pub defender_id: EntityId,
    /// Whether the defender is a user or an AI.
    pub defender_role: ControllerKind,
    /// Forces the attacker committed.
    pub committed: Roster,
    /// Outcome classification.
    pub tier: BattleTier,
    /// Units the attacker lost.
    pub attacker_losses: Roster,
    /// Units the defender lost.
    pub defender_losses: Roster,
    /// Resources removed from the defender. The attacker is credited the
    /// amount resolved in battle, which exceeds this only when the
    /// defender's treasury shrank between resolution and settlement.
    #[ts(as = "BTreeMap<LootKind, String>")]
    pub resources_stolen: BTreeMap<LootKind, Decimal>,
    /// Attacker power after luck and morale.
    pub attacker_power: f64,
    /// Defender power after luck and morale.
    pub defender_power: f64,
    /// When the engagement was resolved.
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn remove_never_goes_negative() {
        let mut roster = Roster::new().with(UnitCategory::Ground, "soldier", 3);
        assert_eq!(roster.remove(UnitCategory::Ground, "soldier", 10), 3);
        assert_eq!(roster.count(UnitCategory::Ground, "soldier"), 0);
        assert_eq!(roster.remove(UnitCategory::Air, "bomber", 1), 0);
    }

    #[test]
    fn apply_losses_saturates() {
        let mut roster = Roster::new()
            .with(UnitCategory::Ground, "soldier", 5)
            .with(UnitCategory::Navy, "submarine", 2);
        let losses = Roster::new()
            .with(UnitCategory::Ground, "soldier", 2)
            .with(UnitCategory::Navy, "submarine", 7);
        roster.apply_losses(&losses);
        assert_eq!(roster.count(UnitCategory::Ground, "soldier"), 3);
        assert_eq!(roster.count(UnitCategory::Navy, "submarine"), 0);
    }

    #[test]
    fn empty_means_no_positive_counts() {
        assert!(Roster::new().is_empty());
        assert!(Roster::new().with(UnitCategory::Air, "bomber", 0).is_empty());
        assert!(!Roster::new().with(UnitCategory::Air, "bomber", 1).is_empty());
    }

    #[test]
    fn covers_checks_every_count() {
        let held = Roster::new().with(UnitCategory::Ground, "soldier", 10);
        assert!(held.covers(&Roster::new().with(UnitCategory::Ground, "soldier", 10)));
        assert!(!held.covers(&Roster::new().with(UnitCategory::Ground, "soldier", 11)));
        assert!(!held.covers(&Roster::new().with(UnitCategory::Air, "bomber", 1)));
    }

    #[test]
    fn roster_persists_as_nested_map() {
        let roster = Roster::new().with(UnitCategory::Ground, "soldier", 100);
        let json = serde_json::to_value(&roster).unwrap();
        assert_eq!(json, serde_json::json!({"ground": {"soldier": 100}}));
        let back: Roster = serde_json::from_value(json).unwrap();
        assert_eq!(back, roster);
    }

    #[test]
    fn compacted_drops_zero_entries() {
        let roster = Roster::new()
            .with(UnitCategory::Ground, "soldier", 0)
            .with(UnitCategory::Air, "bomber", 2)
            .compacted();
        assert_eq!(roster.categories().collect::<Vec<_>>(), vec![UnitCategory::Air]);
    }

    #[test]
    fn clamps_tech_and_morale() {
        let now = Utc::now();
        let mut c = Combatant {
            id: EntityId::new(),
            name: String::from("Testland"),
            controller: ControllerKind::Ai,
            personality: Some(Personality::Diplomatic),
            roster: Roster::new(),
            tech_level: 1,
            morale: 100.0,
            money: Decimal::ZERO,
            buildings: BTreeMap::new(),
            loan: LoanState::default(),
            last_production_update: now,
            last_action_at: None,
            last_decision: None,
            created_at: now,
            version: 0,
        };
        c.set_tech_level(42);
        assert_eq!(c.tech_level, MAX_TECH_LEVEL);
        c.set_tech_level(0);
        assert_eq!(c.tech_level, MIN_TECH_LEVEL);
        c.set_morale(150.0);
        assert!((c.morale - MAX_MORALE).abs() < f64::EPSILON);
        c.set_morale(f64::NAN);
        assert!(c.morale.abs() < f64::EPSILON);
        c.record_action(String::from("negotiate"), now);
        assert_eq!(c.last_action_at, Some(now));
    }
}
