//! Shared type definitions for the Garrison strategy game core.
//!
//! This crate is the single source of truth for the data contracts used
//! across the workspace: the combat resolver, the production and loan
//! ledger, the state store, and the agent scheduler all speak these types.
//! Front-end collaborators receive `TypeScript` bindings via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entities and battle records
//! - [`enums`] -- Unit categories, battle tiers, controllers, personalities
//! - [`structs`] -- Rosters, combatants, loans, and battle records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BattleTier, CombatRole, ControllerKind, LootKind, Personality, UnitCategory};
pub use ids::{BattleId, EntityId};
pub use structs::{
    BattleRecord, Combatant, LoanState, MAX_MORALE, MAX_TECH_LEVEL, MIN_TECH_LEVEL, Roster,
    UnitSpec,
};
