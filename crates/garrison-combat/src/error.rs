//! Error types for the garrison-combat crate.

use garrison_types::UnitCategory;

/// Errors raised while validating or resolving an engagement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    /// The attacker committed no units.
    #[error("attacker committed no units")]
    EmptyRoster,

    /// A roster names a category/unit pair missing from the catalog.
    #[error("unknown unit {unit:?} in category {category}")]
    UnknownUnit {
        /// The category that was looked up.
        category: UnitCategory,
        /// The unit name that was not found.
        unit: String,
    },

    /// A decimal computation overflowed.
    #[error("arithmetic overflow in combat computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}
