//! Combat resolution between two rosters.
//!
//! ## Resolution flow
//!
//! 1. Validate both rosters against the catalog; reject an empty attacker
//!    commitment.
//! 2. Compute base power: `sum(count * stat) * (1 + tech_level * 0.05)`,
//!    using attack stats for the attacker and defense stats for the defender.
//! 3. Multiply each side by its own luck roll in `[0.9, 1.2]` and by
//!    `morale / 100`.
//! 4. Classify the ratio of final powers into a [`BattleTier`], which fixes
//!    the loss rates for both sides and the share of defender money stolen.
//!
//! Resolution is pure. The caller applies losses and theft to both
//! combatants and appends the battle record.

use std::collections::BTreeMap;

use garrison_types::{BattleTier, CombatRole, Combatant, LootKind, Roster};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::catalog::UnitCatalog;
use crate::error::CombatError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lower bound of the per-side luck multiplier.
pub const LUCK_MIN: f64 = 0.9;

/// Upper bound of the per-side luck multiplier.
pub const LUCK_MAX: f64 = 1.2;

/// Power bonus per technology level (5%).
const TECH_POWER_BONUS: f64 = 0.05;

/// Attacker/defender ratio above which a win is decisive.
const DECISIVE_RATIO: f64 = 1.5;

/// Attacker/defender ratio below which a loss is heavy.
const HEAVY_LOSS_RATIO: f64 = 0.7;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The per-entity stats that feed a resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatStats {
    /// Technology level.
    pub tech_level: u8,
    /// Morale percentage.
    pub morale: f64,
    /// Treasury balance (only the defender's matters, for theft).
    pub money: Decimal,
}

impl CombatStats {
    /// Snapshot the stats of a combatant.
    pub const fn of(combatant: &Combatant) -> Self {
        Self {
            tech_level: combatant.tech_level,
            morale: combatant.morale,
            money: combatant.money,
        }
    }
}

/// The two luck multipliers of one engagement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Luck {
    /// Multiplier applied to the attacker's power.
    pub attacker: f64,
    /// Multiplier applied to the defender's power.
    pub defender: f64,
}

impl Luck {
    /// No luck on either side.
    pub const NEUTRAL: Self = Self {
        attacker: 1.0,
        defender: 1.0,
    };

    /// Draw two independent multipliers uniformly from `[0.9, 1.2]`.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            attacker: rng.random_range(LUCK_MIN..=LUCK_MAX),
            defender: rng.random_range(LUCK_MIN..=LUCK_MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Loss and theft rates attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEffects {
    /// Fraction of each committed attacker unit lost.
    pub attacker_loss_rate: Decimal,
    /// Fraction of each defending unit lost.
    pub defender_loss_rate: Decimal,
    /// Fraction of the defender's money stolen.
    pub theft_rate: Decimal,
}

/// Rates for each outcome tier.
pub const fn tier_effects(tier: BattleTier) -> TierEffects {
    let (attacker, defender, theft) = match tier {
        BattleTier::DecisiveWin => (10, 40, 30),
        BattleTier::MinorWin => (25, 30, 15),
        BattleTier::MinorLoss => (30, 20, 0),
        BattleTier::HeavyLoss => (40, 10, 0),
        BattleTier::Draw => (20, 20, 0),
    };
    TierEffects {
        attacker_loss_rate: Decimal::from_parts(attacker, 0, 0, false, 2),
        defender_loss_rate: Decimal::from_parts(defender, 0, 0, false, 2),
        theft_rate: Decimal::from_parts(theft, 0, 0, false, 2),
    }
}

/// The result of a resolved engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleOutcome {
    /// Outcome classification.
    pub tier: BattleTier,
    /// Units the attacker loses from its committed forces.
    pub attacker_losses: Roster,
    /// Units the defender loses from its defending forces.
    pub defender_losses: Roster,
    /// Resources taken from the defender. Empty unless the attacker won.
    pub resources_stolen: BTreeMap<LootKind, Decimal>,
    /// Final attacker power after luck and morale.
    pub attacker_power: f64,
    /// Final defender power after luck and morale.
    pub defender_power: f64,
}

impl BattleOutcome {
    /// Amount of one resource stolen, zero when none.
    pub fn stolen(&self, kind: LootKind) -> Decimal {
        self.resources_stolen
            .get(&kind)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Base power of a roster for one role, scaled by technology.
///
/// `sum(count * spec[role]) * (1 + tech_level * 0.05)`. Every entry must
/// exist in the catalog.
pub fn power(
    catalog: &UnitCatalog,
    roster: &Roster,
    tech_level: u8,
    role: CombatRole,
) -> Result<f64, CombatError> {
    let mut raw = 0.0_f64;
    for (category, unit, count) in roster.iter() {
        let spec = catalog.spec(category, unit)?;
        raw += f64::from(count) * f64::from(spec.value(role));
    }
    Ok(raw * TECH_POWER_BONUS.mul_add(f64::from(tech_level), 1.0))
}

/// Classify final powers into a tier.
///
/// | Condition | Tier |
/// |---|---|
/// | `A > 1.5D` | decisive win |
/// | `D < A <= 1.5D` | minor win |
/// | `A == D` | draw |
/// | `0.7D <= A < D` | minor loss |
/// | `A < 0.7D` | heavy loss |
pub fn classify(attacker_power: f64, defender_power: f64) -> BattleTier {
    match attacker_power.partial_cmp(&defender_power) {
        Some(core::cmp::Ordering::Greater) => {
            if attacker_power > defender_power * DECISIVE_RATIO {
                BattleTier::DecisiveWin
            } else {
                BattleTier::MinorWin
            }
        }
        Some(core::cmp::Ordering::Less) => {
            if attacker_power < defender_power * HEAVY_LOSS_RATIO {
                BattleTier::HeavyLoss
            } else {
                BattleTier::MinorLoss
            }
        }
        Some(core::cmp::Ordering::Equal) | None => BattleTier::Draw,
    }
}

/// Per-unit losses: `floor(count * rate)` for every entry of `roster`.
///
/// Entries that lose nothing are omitted. `rate` is expected in `[0, 1]`,
/// so a loss never exceeds the count it was taken from.
pub fn compute_losses(roster: &Roster, rate: Decimal) -> Result<Roster, CombatError> {
    let rate = rate.clamp(Decimal::ZERO, Decimal::ONE);
    let mut losses = Roster::new();
    for (category, unit, count) in roster.iter() {
        let lost = Decimal::from(count)
            .checked_mul(rate)
            .ok_or_else(|| CombatError::ArithmeticOverflow {
                context: format!("losses for {category}/{unit}"),
            })?
            .floor()
            .to_u32()
            .unwrap_or(0)
            .min(count);
        if lost > 0 {
            losses.set(category, unit, lost);
        }
    }
    Ok(losses)
}

/// Resolve an engagement, rolling luck from `rng`.
///
/// `defender_roster` is the explicit defending subset when one was
/// supplied, otherwise the defender's entire roster.
pub fn resolve_battle<R: Rng + ?Sized>(
    catalog: &UnitCatalog,
    attacker_roster: &Roster,
    attacker: &CombatStats,
    defender_roster: &Roster,
    defender: &CombatStats,
    rng: &mut R,
) -> Result<BattleOutcome, CombatError> {
    let luck = Luck::roll(rng);
    resolve_battle_with_luck(catalog, attacker_roster, attacker, defender_roster, defender, luck)
}

/// Resolve an engagement with fixed luck multipliers.
pub fn resolve_battle_with_luck(
    catalog: &UnitCatalog,
    attacker_roster: &Roster,
    attacker: &CombatStats,
    defender_roster: &Roster,
    defender: &CombatStats,
    luck: Luck,
) -> Result<BattleOutcome, CombatError> {
    if attacker_roster.is_empty() {
        return Err(CombatError::EmptyRoster);
    }
    catalog.validate(attacker_roster)?;
    catalog.validate(defender_roster)?;

    let attacker_base = power(catalog, attacker_roster, attacker.tech_level, CombatRole::Attack)?;
    let defender_base = power(catalog, defender_roster, defender.tech_level, CombatRole::Defense)?;

    let attacker_power = attacker_base * luck.attacker * (attacker.morale / 100.0);
    let defender_power = defender_base * luck.defender * (defender.morale / 100.0);

    let tier = classify(attacker_power, defender_power);
    let effects = tier_effects(tier);

    let attacker_losses = compute_losses(attacker_roster, effects.attacker_loss_rate)?;
    let defender_losses = compute_losses(defender_roster, effects.defender_loss_rate)?;
    let resources_stolen = plunder(defender.money, effects.theft_rate)?;

    tracing::debug!(
        tier = tier.as_str(),
        attacker_power,
        defender_power,
        attacker_luck = luck.attacker,
        defender_luck = luck.defender,
        "Battle resolved"
    );

    Ok(BattleOutcome {
        tier,
        attacker_losses,
        defender_losses,
        resources_stolen,
        attacker_power,
        defender_power,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Money taken at `rate`, rounded to cents. Nothing is taken from an empty
/// or negative treasury.
fn plunder(money: Decimal, rate: Decimal) -> Result<BTreeMap<LootKind, Decimal>, CombatError> {
    let mut stolen = BTreeMap::new();
    if rate <= Decimal::ZERO || money <= Decimal::ZERO {
        return Ok(stolen);
    }
    let amount = money
        .checked_mul(rate)
        .ok_or_else(|| CombatError::ArithmeticOverflow {
            context: String::from("theft amount"),
        })?
        .round_dp(2);
    if amount > Decimal::ZERO {
        stolen.insert(LootKind::Money, amount.min(money));
    }
    Ok(stolen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
