//! Personality strategies: one way of choosing an action per temperament.
//!
//! A [`Strategy`] only decides. Applying the [`Decision`] (and committing
//! its effects under the entity's lock) is the scheduler's job, so
//! strategies stay synchronous and deterministic for a given RNG state.

use std::collections::BTreeMap;

use garrison_combat::UnitCatalog;
use garrison_types::{Combatant, EntityId, Personality, Roster, UnitCategory};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

/// Most units of one type an aggressive attack commits.
const MAX_COMMIT_PER_UNIT: u32 = 10;

/// An action chosen for one AI entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Attack `target` with `committed`.
    Attack {
        /// The opponent.
        target: EntityId,
        /// Opponent name, for the action description.
        target_name: String,
        /// Forces sent.
        committed: Roster,
    },
    /// Grow one unit count.
    Reinforce {
        /// Unit category.
        category: UnitCategory,
        /// Unit name.
        unit: String,
        /// Units added.
        amount: u32,
    },
    /// Raise the tech level by one, capped at the maximum.
    Research,
    /// Offer an alliance. Description only.
    ProposeAlliance,
    /// Negotiate. No effect.
    Negotiate,
    /// Review the country's state. No effect.
    StatusCheck,
}

impl Decision {
    /// Human-readable description recorded on the entity.
    pub fn describe(&self) -> String {
        match self {
            Self::Attack {
                target_name,
                committed,
                ..
            } => format!(
                "attack {target_name} with {} units",
                committed.total_units()
            ),
            Self::Reinforce {
                category,
                unit,
                amount,
            } => format!("build {amount} {unit} ({category})"),
            Self::Research => String::from("research technology"),
            Self::ProposeAlliance => String::from("propose alliance"),
            Self::Negotiate => String::from("negotiate"),
            Self::StatusCheck => String::from("status check"),
        }
    }
}

/// What a strategy sees when deciding.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// The entity deciding.
    pub entity: &'a Combatant,
    /// Every other registered entity.
    pub opponents: &'a [Combatant],
    /// The unit catalog.
    pub catalog: &'a UnitCatalog,
}

/// Chooses one action per wake for an AI entity.
pub trait Strategy: Send + Sync {
    /// The temperament this strategy implements.
    fn personality(&self) -> Personality;

    /// Pick an action.
    fn decide(&self, ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Decision;
}

/// Attack, build a random unit, or check status.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggressiveStrategy;

impl Strategy for AggressiveStrategy {
    fn personality(&self) -> Personality {
        Personality::Aggressive
    }

    fn decide(&self, ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Decision {
        match rng.random_range(0..3_u8) {
            0 => plan_attack(ctx, rng).unwrap_or(Decision::StatusCheck),
            1 => {
                let categories = ctx.catalog.categories();
                categories
                    .choose(rng)
                    .and_then(|&category| reinforce(ctx.catalog, category, 1..=5, rng))
                    .unwrap_or(Decision::StatusCheck)
            }
            _ => Decision::StatusCheck,
        }
    }
}

/// Reinforce the defense category or check status.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefensiveStrategy;

impl Strategy for DefensiveStrategy {
    fn personality(&self) -> Personality {
        Personality::Defensive
    }

    fn decide(&self, ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Decision {
        if rng.random_bool(0.5) {
            reinforce(ctx.catalog, UnitCategory::Defense, 1..=3, rng).unwrap_or(Decision::StatusCheck)
        } else {
            Decision::StatusCheck
        }
    }
}

/// Propose an alliance, research, or negotiate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiplomaticStrategy;

impl Strategy for DiplomaticStrategy {
    fn personality(&self) -> Personality {
        Personality::Diplomatic
    }

    fn decide(&self, _ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Decision {
        match rng.random_range(0..3_u8) {
            0 => Decision::ProposeAlliance,
            1 => Decision::Research,
            _ => Decision::Negotiate,
        }
    }
}

/// Personality -> strategy lookup. Entities without a known personality
/// fall back to the diplomatic strategy.
pub struct StrategyRegistry {
    strategies: BTreeMap<Personality, Box<dyn Strategy>>,
    fallback: Box<dyn Strategy>,
}

impl StrategyRegistry {
    /// A registry with only the fallback strategy.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
            fallback: Box::new(DiplomaticStrategy),
        }
    }

    /// Register (or replace) the strategy for its personality.
    #[must_use]
    pub fn with(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.insert(strategy.personality(), strategy);
        self
    }

    /// The strategy for `personality`.
    pub fn for_personality(&self, personality: Option<Personality>) -> &dyn Strategy {
        personality
            .and_then(|p| self.strategies.get(&p))
            .map_or(self.fallback.as_ref(), |strategy| strategy.as_ref())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::empty()
            .with(Box::new(AggressiveStrategy))
            .with(Box::new(DefensiveStrategy))
            .with(Box::new(DiplomaticStrategy))
    }
}

/// Commit one random held unit per held category, `min(owned, 1..=10)` of
/// it, against a random opponent.
fn plan_attack(ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Option<Decision> {
    let target = ctx.opponents.choose(rng)?;

    let mut committed = Roster::new();
    let categories: Vec<UnitCategory> = ctx.entity.roster.categories().collect();
    for category in categories {
        let held: Vec<(&str, u32)> = ctx
            .entity
            .roster
            .iter()
            .filter(|&(c, _, count)| c == category && count > 0)
            .map(|(_, unit, count)| (unit, count))
            .collect();
        let Some(&(unit, owned)) = held.choose(rng) else {
            continue;
        };
        let count = owned.min(rng.random_range(1..=MAX_COMMIT_PER_UNIT));
        committed.set(category, unit, count);
    }

    if committed.is_empty() {
        return None;
    }
    Some(Decision::Attack {
        target: target.id,
        target_name: target.name.clone(),
        committed,
    })
}

fn reinforce(
    catalog: &UnitCatalog,
    category: UnitCategory,
    amount: core::ops::RangeInclusive<u32>,
    rng: &mut StdRng,
) -> Option<Decision> {
    let unit = *catalog.unit_names(category).choose(rng)?;
    Some(Decision::Reinforce {
        category,
        unit: unit.to_owned(),
        amount: rng.random_range(amount),
    })
}
