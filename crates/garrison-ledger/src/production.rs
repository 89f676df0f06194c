//! Building output and time-based treasury accrual.
//!
//! Production buildings are named `<tier prefix><category>`: the bare name
//! is the low tier, `advanced_` the middle tier and `professional_` the
//! high tier. Power plants have a fourth tier, `nuclear_power_plant`. Any
//! other building (hospitals, parks, ...) is held but yields nothing.

use chrono::{DateTime, Utc};
use garrison_types::Combatant;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::LedgerError;

/// Base daily output per producing building.
const BUILDING_RATES: &[(&str, u32)] = &[
    ("factory", 50),
    ("advanced_factory", 100),
    ("professional_factory", 150),
    ("mine", 30),
    ("advanced_mine", 60),
    ("professional_mine", 90),
    ("power_plant", 40),
    ("advanced_power_plant", 80),
    ("professional_power_plant", 120),
    ("nuclear_power_plant", 200),
    ("tanker", 25),
    ("advanced_tanker", 50),
    ("professional_tanker", 75),
];

const SECONDS_PER_DAY: i64 = 86_400;

/// Daily base output of one building, or `None` if it produces nothing.
pub fn base_rate(building: &str) -> Option<u32> {
    BUILDING_RATES
        .iter()
        .find(|(name, _)| *name == building)
        .map(|&(_, rate)| rate)
}

/// Whole currency units the entity's buildings yield per day.
///
/// `floor(sum(count * base_rate) * (1 + tech_level * 0.10) * morale / 100)`
pub fn compute_daily_production(entity: &Combatant) -> Result<u64, LedgerError> {
    let mut base = Decimal::ZERO;
    for (building, &count) in &entity.buildings {
        let Some(rate) = base_rate(building) else {
            continue;
        };
        base = base
            .checked_add(Decimal::from(u64::from(count).saturating_mul(u64::from(rate))))
            .ok_or(LedgerError::Overflow("building output"))?;
    }

    let tech_bonus = Decimal::new(i64::from(entity.tech_level), 1)
        .checked_add(Decimal::ONE)
        .ok_or(LedgerError::Overflow("tech multiplier"))?;
    let morale = Decimal::from_f64(entity.morale.clamp(0.0, 100.0)).unwrap_or(Decimal::ZERO);

    let daily = base
        .checked_mul(tech_bonus)
        .and_then(|v| v.checked_mul(morale))
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(LedgerError::Overflow("daily production"))?;

    Ok(daily.trunc().to_u64().unwrap_or(0))
}

/// Credit production earned since `last_production_update` and advance the
/// timestamp to `now`. Returns the amount credited.
///
/// Credits `floor(daily * elapsed_seconds / 86400)`. Zero elapsed time
/// changes nothing. A `now` earlier than the stored timestamp credits
/// nothing and leaves the timestamp where it is.
pub fn apply_accrual(entity: &mut Combatant, now: DateTime<Utc>) -> Result<u64, LedgerError> {
    let elapsed = now
        .signed_duration_since(entity.last_production_update)
        .num_seconds();
    if elapsed <= 0 {
        return Ok(0);
    }

    let daily = compute_daily_production(entity)?;
    let earned = Decimal::from(daily)
        .checked_mul(Decimal::from(elapsed))
        .and_then(|v| v.checked_div(Decimal::from(SECONDS_PER_DAY)))
        .ok_or(LedgerError::Overflow("accrued production"))?
        .floor();

    entity.money = entity
        .money
        .checked_add(earned)
        .ok_or(LedgerError::Overflow("treasury balance"))?;
    entity.last_production_update = now;

    let credited = earned.to_u64().unwrap_or(0);
    tracing::debug!(
        entity_id = %entity.id,
        daily,
        elapsed_secs = elapsed,
        credited,
        "Production accrued"
    );
    Ok(credited)
}
