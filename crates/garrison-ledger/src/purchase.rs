//! Buying units with treasury money.

use garrison_types::{Combatant, UnitCategory, UnitSpec};
use rust_decimal::Decimal;

use crate::LedgerError;

/// Buy `count` units of `unit` at `spec.price` each. Returns the total paid.
///
/// The caller resolves `spec` from the unit catalog, so the unit name is
/// already known to be valid here.
pub fn purchase_units(
    entity: &mut Combatant,
    category: UnitCategory,
    unit: &str,
    count: u32,
    spec: &UnitSpec,
) -> Result<Decimal, LedgerError> {
    if count == 0 {
        return Err(LedgerError::ZeroCount);
    }
    let price = Decimal::from(u64::from(count).saturating_mul(u64::from(spec.price)));
    if price > entity.money {
        return Err(LedgerError::InsufficientFunds {
            required: price,
            available: entity.money,
        });
    }

    entity.money = entity
        .money
        .checked_sub(price)
        .ok_or(LedgerError::Overflow("treasury balance"))?;
    let held = entity.roster.add(category, unit, count);

    tracing::info!(
        entity_id = %entity.id,
        category = %category,
        unit,
        count,
        held,
        price = %price,
        "Units purchased"
    );
    Ok(price)
}
