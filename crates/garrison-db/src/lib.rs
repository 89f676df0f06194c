//! State store for the Garrison strategy core.
//!
//! The game core only needs entity read/write and an append-only battle
//! log. This crate defines that contract as the [`StateStore`] trait and
//! ships two backends:
//!
//! ```text
//! GameService / AgentScheduler
//!     |
//!     +-- StateStore (trait)
//!           |-- InMemoryStore   (tests, store-less runs)
//!           +-- PgStateStore    (PostgreSQL, migrated on connect)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The [`StateStore`] trait
//! - [`memory`] -- [`InMemoryStore`]
//! - [`pg_store`] -- [`PgStateStore`] and its row types
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod pg_store;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::InMemoryStore;
pub use pg_store::{BattleRow, CombatantRow, PgStateStore};
pub use store::StateStore;
