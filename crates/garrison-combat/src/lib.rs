//! Unit catalog and combat resolution for the Garrison strategy core.
//!
//! Combat is a pure function of two rosters, each side's technology level
//! and morale, and two luck multipliers. It never touches storage: the
//! caller applies the returned losses and theft to the combatants and
//! persists the battle record.
//!
//! # Architecture
//!
//! - [`catalog`] -- The static [`UnitCatalog`] of unit stats and prices.
//! - [`combat`] -- Power computation, tier classification, and
//!   [`resolve_battle`].
//! - [`error`] -- [`CombatError`].
//!
//! # Outcome tiers
//!
//! | Tier | Attacker loss | Defender loss | Money stolen |
//! |------|---------------|---------------|--------------|
//! | Decisive win | 10% | 40% | 30% |
//! | Minor win | 25% | 30% | 15% |
//! | Draw | 20% | 20% | 0% |
//! | Minor loss | 30% | 20% | 0% |
//! | Heavy loss | 40% | 10% | 0% |
//!
//! # Usage
//!
//! ```
//! use garrison_combat::{CombatStats, Luck, UnitCatalog, resolve_battle_with_luck};
//! use garrison_types::{BattleTier, Roster, UnitCategory};
//! use rust_decimal::Decimal;
//!
//! let catalog = UnitCatalog::standard();
//! let attackers = Roster::new().with(UnitCategory::Ground, "soldier", 100);
//! let defenders = Roster::new().with(UnitCategory::Ground, "soldier", 10);
//! let stats = CombatStats { tech_level: 0, morale: 100.0, money: Decimal::ZERO };
//!
//! let outcome = resolve_battle_with_luck(
//!     &catalog, &attackers, &stats, &defenders, &stats, Luck::NEUTRAL,
//! ).ok();
//! assert_eq!(outcome.map(|o| o.tier), Some(BattleTier::DecisiveWin));
//! ```

pub mod catalog;
pub mod combat;
pub mod error;

pub use catalog::UnitCatalog;
pub use combat::{
    BattleOutcome, CombatStats, LUCK_MAX, LUCK_MIN, Luck, TierEffects, classify, compute_losses,
    power, resolve_battle, resolve_battle_with_luck, tier_effects,
};
pub use error::CombatError;
