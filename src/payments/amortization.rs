use rust_decimal::Decimal;

use crate::charges::ScheduledCharge;
use crate::decimal::{Money, Rate};
use crate::interest::{period_accrual_rates, RateAccumulator, RATE_PRECISION};

/// fixed installment that amortizes `principal` over `periods` at `rate` per period
///
/// `P * r / (1 - (1 + r)^-n)`; zero periods pay the whole principal at once and
/// a zero rate splits it evenly
pub fn annuity_payment(principal: Money, rate: Rate, periods: u32) -> Money {
    if periods == 0 {
        tracing::warn!(%principal, "annuity over zero periods, paying the whole principal");
        return principal;
    }

    let r = rate.as_decimal();
    if r.is_zero() {
        return principal / Decimal::from(periods);
    }

    // calculate (1 + r)^n using iteration
    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + r;
    for _ in 0..periods {
        compound *= base;
    }

    let numerator = principal.as_decimal() * r * compound;
    let denominator = compound - Decimal::ONE;

    Money::from_decimal(numerator / denominator)
}

/// contractual installment of a case: the annuity of its maximum balance at the
/// geometric mean of the per-period interest rates, rounded to minor units
pub fn loan_payment_size(
    maximum_balance: Money,
    interest_rate: Decimal,
    charges: &[ScheduledCharge],
    minor_currency_unit_digits: u32,
) -> Money {
    let rates = period_accrual_rates(charges, interest_rate, RATE_PRECISION);
    if rates.is_empty() {
        return maximum_balance.round_to_minor(minor_currency_unit_digits);
    }

    let accumulator: RateAccumulator = rates.values().copied().collect();
    let mean = accumulator.geometric_mean(RATE_PRECISION);

    annuity_payment(maximum_balance, mean, accumulator.count()).round_to_minor(minor_currency_unit_digits)
}
