//! The game-level error taxonomy and the `(ok, message)` reply shape.
//!
//! Crate errors from combat, ledger, and storage are lifted into
//! [`GameError`]. Validation, cooldown, and insufficient-funds errors are
//! user-facing: they are turned into a message at the call boundary and
//! never abort anything beyond the rejected action.

use garrison_combat::CombatError;
use garrison_db::DbError;
use garrison_ledger::LedgerError;
use garrison_types::EntityId;
use rust_decimal::Decimal;
use serde::Serialize;

/// Errors surfaced by game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A bad amount, unknown unit, or empty or oversized commitment.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A loan was requested inside the cooldown window.
    #[error("loan cooldown active, {remaining_secs}s remaining")]
    Cooldown {
        /// Seconds until a new loan may be issued.
        remaining_secs: i64,
    },

    /// The treasury cannot cover the payment.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount the operation needs.
        required: Decimal,
        /// Amount the treasury holds.
        available: Decimal,
    },

    /// The referenced entity does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The store was unreachable or a write conflicted.
    #[error("persistence failure: {0}")]
    Persistence(DbError),

    /// One AI entity's decision failed. Never escapes a scheduler cycle.
    #[error("agent decision failed for {entity_id}: {reason}")]
    TransientAgent {
        /// The entity whose decision failed.
        entity_id: EntityId,
        /// What went wrong.
        reason: String,
    },
}

impl GameError {
    /// Whether the error is the caller's to fix, as opposed to an
    /// infrastructure failure.
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Cooldown { .. }
                | Self::InsufficientFunds { .. }
                | Self::EntityNotFound(_)
        )
    }

    /// Message suitable for showing to a player.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => format!("Request rejected: {reason}."),
            Self::Cooldown { remaining_secs } => {
                let hours = remaining_secs / 3600;
                let minutes = (remaining_secs % 3600) / 60;
                format!("You must wait {hours}h {minutes}m before taking another loan.")
            }
            Self::InsufficientFunds {
                required,
                available,
            } => format!("Insufficient funds: {required} needed, {available} available."),
            Self::EntityNotFound(_) => String::from("Country not found."),
            Self::Persistence(_) | Self::TransientAgent { .. } => {
                String::from("The action could not be completed. Please try again later.")
            }
        }
    }
}

impl From<DbError> for GameError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(id) => Self::EntityNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl From<LedgerError> for GameError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Cooldown { remaining_secs } => Self::Cooldown { remaining_secs },
            LedgerError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<CombatError> for GameError {
    fn from(err: CombatError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// The `(ok, message)` pair returned to front-end collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReply {
    /// Whether the action took effect.
    pub ok: bool,
    /// What happened, in player-facing words.
    pub message: String,
}

impl ActionReply {
    /// A successful reply.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// A failed reply carrying the error's player-facing message.
    pub fn failure(err: &GameError) -> Self {
        Self {
            ok: false,
            message: err.user_message(),
        }
    }
}
