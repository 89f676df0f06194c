//! Starting holdings for newly registered countries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use garrison_types::{
    Combatant, ControllerKind, EntityId, LoanState, MAX_MORALE, MIN_TECH_LEVEL, Personality, Roster,
    UnitCategory,
};
use rust_decimal::Decimal;

/// Seeded roster: `(category, unit, count)`.
const STARTING_ROSTER: &[(UnitCategory, &str, u32)] = &[
    (UnitCategory::Ground, "recruit", 10),
    (UnitCategory::Ground, "rpg_trooper", 60),
    (UnitCategory::Ground, "sniper", 65),
    (UnitCategory::Ground, "veteran_soldier", 1185),
    (UnitCategory::Ground, "heavy_artillery", 53),
    (UnitCategory::Ground, "soldier", 100),
    (UnitCategory::Ground, "artillery", 2),
    (UnitCategory::Air, "light_fighter", 5),
    (UnitCategory::Air, "heavy_fighter", 3),
    (UnitCategory::Air, "bomber", 2),
    (UnitCategory::Air, "attack_helicopter", 10),
    (UnitCategory::Defense, "air_defense", 5),
    (UnitCategory::Defense, "advanced_air_defense", 312),
    (UnitCategory::Defense, "heavy_air_defense", 100),
    (UnitCategory::Navy, "carrier", 20),
    (UnitCategory::Navy, "submarine", 31),
    (UnitCategory::Navy, "warship", 105),
    (UnitCategory::Navy, "gunboat", 10),
    (UnitCategory::Cyber, "elite_hacker", 10),
    (UnitCategory::Cyber, "hacker_team", 2),
    (UnitCategory::Missiles, "short_range", 10),
    (UnitCategory::Missiles, "medium_range", 5),
    (UnitCategory::Missiles, "long_range", 3),
    (UnitCategory::Missiles, "ballistic", 2),
    (UnitCategory::Special, "small_bomb", 1340),
    (UnitCategory::Special, "nuclear_bomb", 295),
];

/// Seeded buildings: `(name, count)`.
const STARTING_BUILDINGS: &[(&str, u32)] = &[
    ("factory", 3),
    ("advanced_factory", 102),
    ("professional_factory", 110),
    ("mine", 3),
    ("advanced_mine", 10),
    ("professional_mine", 221),
    ("power_plant", 3),
    ("advanced_power_plant", 110),
    ("professional_power_plant", 10),
    ("tanker", 10),
    ("professional_tanker", 330),
    ("hospital", 3),
    ("maternity_ward", 9),
    ("park", 10),
];

/// The roster every country starts with.
pub fn starting_roster() -> Roster {
    STARTING_ROSTER
        .iter()
        .fold(Roster::new(), |roster, &(category, unit, count)| {
            roster.with(category, unit, count)
        })
}

/// The buildings every country starts with.
pub fn starting_buildings() -> BTreeMap<String, u32> {
    STARTING_BUILDINGS
        .iter()
        .map(|&(name, count)| (name.to_owned(), count))
        .collect()
}

/// A fresh country with seeded holdings.
///
/// Human players carry no personality; AI countries default to
/// aggressive when none is given.
pub fn new_combatant(
    name: &str,
    controller: ControllerKind,
    personality: Option<Personality>,
    money: Decimal,
    now: DateTime<Utc>,
) -> Combatant {
    let personality = match controller {
        ControllerKind::User => None,
        ControllerKind::Ai => Some(personality.unwrap_or(Personality::Aggressive)),
    };
    Combatant {
        id: EntityId::new(),
        name: name.trim().to_owned(),
        controller,
        personality,
        roster: starting_roster(),
        tech_level: MIN_TECH_LEVEL,
        morale: MAX_MORALE,
        money,
        buildings: starting_buildings(),
        loan: LoanState::default(),
        last_production_update: now,
        last_action_at: None,
        last_decision: None,
        created_at: now,
        version: 0,
    }
}
