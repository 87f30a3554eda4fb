pub mod compound;

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::charges::ScheduledCharge;
use crate::decimal::Rate;
use crate::schedule::Period;
use crate::types::{ChargeMethod, TemporalUnit};

pub use compound::{compound_rates, geometric_mean_rate, RateAccumulator};

/// scale used for intermediate rates
pub const RATE_PRECISION: u32 = 16;

/// scale a rate denominated over `cycle_unit` down to the length of the action period
pub fn scaled_rate(rate: Decimal, action_period: Option<&Period>, cycle_unit: Option<TemporalUnit>) -> Decimal {
    match (action_period, cycle_unit) {
        (Some(period), Some(unit)) => {
            let seconds = Decimal::from(period.duration().num_seconds());
            rate * seconds / Decimal::from(unit.estimated_seconds())
        }
        _ => rate,
    }
}

/// compounded interest rate of each repayment period, from the interest charges
/// that recognize an amount inside it
pub fn period_accrual_rates(
    charges: &[ScheduledCharge],
    interest_rate: Decimal,
    precision: u32,
) -> BTreeMap<Period, Rate> {
    let annual = interest_rate / Decimal::ONE_HUNDRED;

    let mut accumulators: BTreeMap<Period, RateAccumulator> = BTreeMap::new();
    for charge in charges {
        if charge.definition.charge_method != ChargeMethod::Interest || !charge.recognizes_amount() {
            continue;
        }
        let Some(period) = charge.scheduled_action.repayment_period else {
            continue;
        };
        let rate = scaled_rate(
            annual,
            charge.scheduled_action.action_period.as_ref(),
            charge.definition.for_cycle_size_unit,
        );
        let accumulator = accumulators.entry(period).or_default();
        *accumulator = accumulator.accumulate(Rate::from_decimal(rate));
    }

    accumulators
        .into_iter()
        .map(|(period, accumulator)| (period, accumulator.compound(precision)))
        .collect()
}
