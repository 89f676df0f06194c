//! Cooldown-gated credit.
//!
//! A combatant may borrow up to the configured ceiling, at most once per
//! cooldown window. The outstanding principal never exceeds the ceiling.
//! Repayment is free of cooldown but limited by both the principal owed and
//! the treasury balance.

use chrono::{DateTime, TimeDelta, Utc};
use garrison_types::Combatant;
use rust_decimal::Decimal;

use crate::LedgerError;

/// Limits applied to loan issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    /// Ceiling on a single loan and on the total outstanding principal.
    pub max_loan: Decimal,
    /// Minimum time between two successful issuances.
    pub cooldown: TimeDelta,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_loan: Decimal::from(5000),
            cooldown: TimeDelta::hours(24),
        }
    }
}

/// Lend `amount` to `entity` at time `now`.
///
/// Checks run in a fixed order: the cooldown first, then the amount. A
/// rejected request leaves the entity untouched.
pub fn issue_loan(
    entity: &mut Combatant,
    amount: Decimal,
    now: DateTime<Utc>,
    policy: &LoanPolicy,
) -> Result<(), LedgerError> {
    if let Some(last) = entity.loan.last_issued_at {
        let since = now.signed_duration_since(last);
        if since < policy.cooldown {
            let remaining = policy.cooldown.checked_sub(&since).unwrap_or(policy.cooldown);
            return Err(LedgerError::Cooldown {
                remaining_secs: remaining.num_seconds().max(1),
            });
        }
    }

    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount { amount });
    }
    let outstanding = entity.loan.outstanding;
    let total = outstanding
        .checked_add(amount)
        .ok_or(LedgerError::Overflow("outstanding principal"))?;
    if amount > policy.max_loan || total > policy.max_loan {
        return Err(LedgerError::LoanLimitExceeded {
            requested: amount,
            outstanding,
            max_loan: policy.max_loan,
        });
    }
    let money = entity
        .money
        .checked_add(amount)
        .ok_or(LedgerError::Overflow("treasury balance"))?;

    entity.money = money;
    entity.loan.outstanding = total;
    entity.loan.last_issued_at = Some(now);

    tracing::info!(
        entity_id = %entity.id,
        amount = %amount,
        outstanding = %total,
        "Loan issued"
    );
    Ok(())
}

/// Repay `amount` of `entity`'s outstanding principal from its treasury.
pub fn repay_loan(entity: &mut Combatant, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount { amount });
    }
    if amount > entity.loan.outstanding {
        return Err(LedgerError::RepaymentExceedsOutstanding {
            amount,
            outstanding: entity.loan.outstanding,
        });
    }
    if amount > entity.money {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: entity.money,
        });
    }

    let money = entity
        .money
        .checked_sub(amount)
        .ok_or(LedgerError::Overflow("treasury balance"))?;
    let outstanding = entity
        .loan
        .outstanding
        .checked_sub(amount)
        .ok_or(LedgerError::Overflow("outstanding principal"))?;

    entity.money = money;
    entity.loan.outstanding = outstanding;

    tracing::info!(
        entity_id = %entity.id,
        amount = %amount,
        outstanding = %outstanding,
        "Loan repaid"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use garrison_types::{ControllerKind, EntityId, LoanState, Roster};

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn country(money: i64) -> Combatant {
        Combatant {
            id: EntityId::new(),
            name: String::from("Borrowland"),
            controller: ControllerKind::User,
            personality: None,
            roster: Roster::new(),
            tech_level: 1,
            morale: 100.0,
            money: Decimal::from(money),
            buildings: BTreeMap::new(),
            loan: LoanState::default(),
            last_production_update: epoch(),
            last_action_at: None,
            last_decision: None,
            created_at: epoch(),
            version: 0,
        }
    }

    #[test]
    fn max_loan_is_accepted() {
        let mut entity = country(100);
        issue_loan(&mut entity, Decimal::from(5000), epoch(), &LoanPolicy::default()).unwrap();
        assert_eq!(entity.money, Decimal::from(5100));
        assert_eq!(entity.loan.outstanding, Decimal::from(5000));
        assert_eq!(entity.loan.last_issued_at, Some(epoch()));
    }

    #[test]
    fn over_limit_is_rejected() {
        let mut entity = country(100);
        let before = entity.clone();
        let err = issue_loan(&mut entity, Decimal::from(5001), epoch(), &LoanPolicy::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::LoanLimitExceeded { .. }));
        assert_eq!(entity, before);
    }

    #[test]
    fn repeat_within_cooldown_is_rejected() {
        let policy = LoanPolicy::default();
        let mut entity = country(0);
        issue_loan(&mut entity, Decimal::from(1000), epoch(), &policy).unwrap();

        let soon = epoch() + TimeDelta::hours(23);
        let err = issue_loan(&mut entity, Decimal::from(1000), soon, &policy).unwrap_err();
        assert_eq!(err, LedgerError::Cooldown { remaining_secs: 3600 });
        assert_eq!(entity.loan.outstanding, Decimal::from(1000));

        let later = epoch() + TimeDelta::hours(24);
        issue_loan(&mut entity, Decimal::from(1000), later, &policy).unwrap();
        assert_eq!(entity.loan.outstanding, Decimal::from(2000));
    }

    #[test]
    fn cooldown_is_checked_before_amount() {
        let policy = LoanPolicy::default();
        let mut entity = country(0);
        issue_loan(&mut entity, Decimal::from(10), epoch(), &policy).unwrap();
        let err = issue_loan(&mut entity, Decimal::from(9999), epoch(), &policy).unwrap_err();
        assert!(matches!(err, LedgerError::Cooldown { .. }));
    }

    #[test]
    fn outstanding_never_exceeds_ceiling() {
        let policy = LoanPolicy::default();
        let mut entity = country(0);
        issue_loan(&mut entity, Decimal::from(4000), epoch(), &policy).unwrap();
        let later = epoch() + TimeDelta::days(2);
        let err = issue_loan(&mut entity, Decimal::from(1500), later, &policy).unwrap_err();
        assert!(matches!(err, LedgerError::LoanLimitExceeded { .. }));
        issue_loan(&mut entity, Decimal::from(1000), later, &policy).unwrap();
        assert_eq!(entity.loan.outstanding, policy.max_loan);
    }

    #[test]
    fn non_positive_loans_are_rejected() {
        let mut entity = country(0);
        for amount in [Decimal::ZERO, Decimal::from(-5)] {
            let err = issue_loan(&mut entity, amount, epoch(), &LoanPolicy::default()).unwrap_err();
            assert_eq!(err, LedgerError::NonPositiveAmount { amount });
        }
        assert_eq!(entity.loan.last_issued_at, None);
    }

    #[test]
    fn repayment_reduces_both_balances() {
        let mut entity = country(500);
        issue_loan(&mut entity, Decimal::from(2000), epoch(), &LoanPolicy::default()).unwrap();
        repay_loan(&mut entity, Decimal::from(1500)).unwrap();
        assert_eq!(entity.money, Decimal::from(1000));
        assert_eq!(entity.loan.outstanding, Decimal::from(500));
        // Repayment does not reset the cooldown clock.
        assert_eq!(entity.loan.last_issued_at, Some(epoch()));
    }

    #[test]
    fn repayment_limits() {
        let mut entity = country(0);
        issue_loan(&mut entity, Decimal::from(300), epoch(), &LoanPolicy::default()).unwrap();

        let err = repay_loan(&mut entity, Decimal::from(301)).unwrap_err();
        assert!(matches!(err, LedgerError::RepaymentExceedsOutstanding { .. }));

        entity.money = Decimal::from(100);
        let err = repay_loan(&mut entity, Decimal::from(200)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: Decimal::from(200),
                available: Decimal::from(100),
            }
        );

        let err = repay_loan(&mut entity, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount { .. }));
        assert_eq!(entity.loan.outstanding, Decimal::from(300));
    }
}
