//! Production accrual, credit, and unit purchase rules for Garrison.
//!
//! Every function in this crate mutates exactly one [`Combatant`] in place
//! and never touches storage. The caller owns atomicity: it loads the
//! entity under its per-entity lock, applies one of these rules, and saves
//! the result before releasing the lock.
//!
//! # Architecture
//!
//! - [`production`] -- Building rate table, daily production, and
//!   time-based accrual.
//! - [`loan`] -- [`LoanPolicy`], loan issuance and repayment.
//! - [`purchase`] -- Buying units with treasury money.
//!
//! # Precision
//!
//! Money is [`Decimal`] throughout. Production is computed in [`Decimal`]
//! and truncated to whole currency units, so accrual never drifts through
//! floating point rounding.
//!
//! [`Combatant`]: garrison_types::Combatant

pub mod loan;
pub mod production;
pub mod purchase;

pub use loan::{LoanPolicy, issue_loan, repay_loan};
pub use production::{apply_accrual, base_rate, compute_daily_production};
pub use purchase::purchase_units;

use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by ledger rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// An amount was zero or negative.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// A loan request exceeds the configured ceiling, on its own or
    /// together with the principal already outstanding.
    #[error("loan of {requested} exceeds the limit of {max_loan} (outstanding {outstanding})")]
    LoanLimitExceeded {
        /// The requested principal.
        requested: Decimal,
        /// Principal already owed.
        outstanding: Decimal,
        /// Configured ceiling.
        max_loan: Decimal,
    },

    /// A loan was requested before the cooldown elapsed.
    #[error("loan cooldown active, {remaining_secs}s remaining")]
    Cooldown {
        /// Seconds until a new loan may be issued.
        remaining_secs: i64,
    },

    /// A repayment is larger than the principal owed.
    #[error("repayment of {amount} exceeds outstanding loan of {outstanding}")]
    RepaymentExceedsOutstanding {
        /// The requested repayment.
        amount: Decimal,
        /// Principal currently owed.
        outstanding: Decimal,
    },

    /// The treasury cannot cover a payment.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount the operation needs.
        required: Decimal,
        /// Amount the treasury holds.
        available: Decimal,
    },

    /// A unit purchase asked for zero units.
    #[error("unit count must be at least 1")]
    ZeroCount,

    /// A decimal computation overflowed.
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}
