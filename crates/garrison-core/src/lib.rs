//! Game orchestration for the Garrison strategy core.
//!
//! This crate ties the pure rule crates to storage. [`GameService`] runs
//! every mutation as an atomic read-modify-write under a per-entity lock,
//! and [`AgentScheduler`] drives AI-controlled countries on a randomized
//! interval.
//!
//! # Modules
//!
//! - [`config`] -- Loading `garrison-config.yaml` into typed structs.
//! - [`error`] -- [`GameError`] and the user-facing [`ActionReply`].
//! - [`locks`] -- Per-entity async locks.
//! - [`registration`] -- Starting roster and buildings for new countries.
//! - [`service`] -- [`GameService`]: loans, purchases, production, attacks.
//! - [`strategy`] -- Personality strategies and the [`StrategyRegistry`].
//! - [`scheduler`] -- The background [`AgentScheduler`] and its
//!   [`DecisionCycle`].
//!
//! [`GameError`]: error::GameError
//! [`ActionReply`]: error::ActionReply
//! [`GameService`]: service::GameService
//! [`StrategyRegistry`]: strategy::StrategyRegistry
//! [`AgentScheduler`]: scheduler::AgentScheduler
//! [`DecisionCycle`]: scheduler::DecisionCycle

pub mod config;
pub mod error;
pub mod locks;
pub mod registration;
pub mod scheduler;
pub mod service;
mod settlement;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, GameConfig};
pub use error::{ActionReply, GameError};
pub use scheduler::{AgentScheduler, CycleReport, DecisionCycle, SchedulerError, SchedulerState};
pub use service::GameService;
pub use strategy::{Decision, Strategy, StrategyRegistry};
