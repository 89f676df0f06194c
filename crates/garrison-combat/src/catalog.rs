//! The static unit catalog: category -> unit name -> {attack, defense, price}.
//!
//! The catalog is read-only at runtime. [`UnitCatalog::standard`] carries the
//! stock table; a deployment may supply its own via configuration, in which
//! case every roster is validated against that table instead.

use std::collections::BTreeMap;

use garrison_types::{Roster, UnitCategory, UnitSpec};
use serde::{Deserialize, Serialize};

use crate::error::CombatError;

/// Stock unit table: `(category, name, attack, defense, price)`.
const STANDARD_UNITS: &[(UnitCategory, &str, u32, u32, u32)] = &[
    (UnitCategory::Ground, "recruit", 10, 5, 50),
    (UnitCategory::Ground, "rpg_trooper", 45, 20, 150),
    (UnitCategory::Ground, "sniper", 70, 30, 200),
    (UnitCategory::Ground, "veteran_soldier", 100, 80, 300),
    (UnitCategory::Ground, "heavy_artillery", 150, 100, 500),
    (UnitCategory::Ground, "soldier", 30, 20, 100),
    (UnitCategory::Ground, "artillery", 80, 60, 250),
    (UnitCategory::Air, "light_fighter", 200, 100, 1000),
    (UnitCategory::Air, "heavy_fighter", 300, 150, 1500),
    (UnitCategory::Air, "bomber", 400, 200, 2000),
    (UnitCategory::Air, "attack_helicopter", 150, 100, 800),
    (UnitCategory::Missiles, "short_range", 500, 0, 3000),
    (UnitCategory::Missiles, "medium_range", 800, 0, 5000),
    (UnitCategory::Missiles, "long_range", 1200, 0, 8000),
    (UnitCategory::Missiles, "ballistic", 1800, 0, 12000),
    (UnitCategory::Defense, "air_defense", 20, 100, 400),
    (UnitCategory::Defense, "advanced_air_defense", 40, 200, 800),
    (UnitCategory::Defense, "heavy_air_defense", 60, 300, 1200),
    (UnitCategory::Navy, "carrier", 300, 200, 2000),
    (UnitCategory::Navy, "submarine", 250, 150, 1500),
    (UnitCategory::Navy, "warship", 200, 100, 1000),
    (UnitCategory::Navy, "gunboat", 100, 50, 500),
    (UnitCategory::Cyber, "elite_hacker", 200, 100, 1500),
    (UnitCategory::Cyber, "hacker_team", 400, 200, 3000),
    (UnitCategory::Special, "small_bomb", 1500, 0, 10000),
    (UnitCategory::Special, "nuclear_bomb", 5000, 0, 50000),
];

/// Lookup table of unit stats keyed by category and unit name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    units: BTreeMap<UnitCategory, BTreeMap<String, UnitSpec>>,
}

impl UnitCatalog {
    /// The stock catalog shipped with the game.
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_UNITS.iter().map(|&(category, name, attack, defense, price)| {
            (
                category,
                name,
                UnitSpec {
                    attack,
                    defense,
                    price,
                },
            )
        }))
    }

    /// Build a catalog from `(category, name, spec)` entries. Later entries
    /// replace earlier ones with the same key.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (UnitCategory, &'a str, UnitSpec)>,
    ) -> Self {
        let mut units: BTreeMap<UnitCategory, BTreeMap<String, UnitSpec>> = BTreeMap::new();
        for (category, name, spec) in entries {
            units.entry(category).or_default().insert(name.to_owned(), spec);
        }
        Self { units }
    }

    /// Look up a unit, returning `None` when absent.
    pub fn get(&self, category: UnitCategory, unit: &str) -> Option<&UnitSpec> {
        self.units.get(&category).and_then(|units| units.get(unit))
    }

    /// Look up a unit, failing with [`CombatError::UnknownUnit`] when absent.
    pub fn spec(&self, category: UnitCategory, unit: &str) -> Result<&UnitSpec, CombatError> {
        self.get(category, unit).ok_or_else(|| CombatError::UnknownUnit {
            category,
            unit: unit.to_owned(),
        })
    }

    /// Categories present in the catalog.
    pub fn categories(&self) -> Vec<UnitCategory> {
        self.units.keys().copied().collect()
    }

    /// Unit names in one category, in name order.
    pub fn unit_names(&self, category: UnitCategory) -> Vec<&str> {
        self.units
            .get(&category)
            .map(|units| units.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of units across all categories.
    pub fn len(&self) -> usize {
        self.units.values().map(BTreeMap::len).sum()
    }

    /// Whether the catalog has no units at all.
    pub fn is_empty(&self) -> bool {
        self.units.values().all(BTreeMap::is_empty)
    }

    /// Check every entry of `roster` against the catalog.
    pub fn validate(&self, roster: &Roster) -> Result<(), CombatError> {
        for (category, unit, _) in roster.iter() {
            self.spec(category, unit)?;
        }
        Ok(())
    }
}
