use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::balances::RunningBalances;
use crate::charges::{ChargeDefinition, ScheduledCharge};
use crate::decimal::Money;
use crate::errors::Result;
use crate::interest::scaled_rate;
use crate::payments::PaymentBuilder;
use crate::types::{AccountDesignator, ChargeMethod, ProportionalBasis};

/// request-level quantities the proportional bases resolve against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeBasis {
    pub maximum_balance: Money,
    /// case interest rate in percent
    pub interest_rate: Decimal,
    /// payment or disbursal size of the action
    pub payment_size: Money,
    /// signed principal movement the action aims for
    pub principal_adjustment: Money,
}

impl ChargeBasis {
    /// value of a proportional basis for one charge, as the fold currently sees it
    pub fn value_of(
        &self,
        basis: ProportionalBasis,
        definition: &ChargeDefinition,
        builder: &PaymentBuilder,
        balances: &dyn RunningBalances,
    ) -> Result<Money> {
        Ok(match basis {
            ProportionalBasis::MaximumBalance => self.maximum_balance,
            ProportionalBasis::RunningBalance => {
                builder.effective_balance(AccountDesignator::CustomerLoanPrincipal, balances)?
            }
            ProportionalBasis::PaymentSize => self.payment_size,
            ProportionalBasis::FromAccountBalance => {
                builder.effective_balance(definition.from_account_designator, balances)?
            }
            ProportionalBasis::ToAccountBalance => {
                builder.effective_balance(definition.to_account_designator, balances)?
            }
            ProportionalBasis::PrincipalAdjustment => self.principal_adjustment,
        })
    }
}

/// the freshly computed amount of one scheduled charge, unrounded
pub fn charge_amount(charge: &ScheduledCharge, basis_value: Money, interest_rate: Decimal) -> Money {
    let definition = &charge.definition;
    let rate = match definition.charge_method {
        ChargeMethod::Fixed => return Money::from_decimal(definition.amount),
        ChargeMethod::Proportional => definition.amount,
        ChargeMethod::Interest => interest_rate / Decimal::ONE_HUNDRED,
    };
    let scaled = scaled_rate(
        rate,
        charge.scheduled_action.action_period.as_ref(),
        definition.for_cycle_size_unit,
    );
    basis_value * scaled
}

/// fold the ordered charges of one pass into the builder
///
/// each charge sees the adjustments of the charges before it. settlements of
/// accrued charges under accrual accounting take the outstanding accrued balance
/// instead of a freshly computed amount
pub fn apply_scheduled_charges(
    builder: PaymentBuilder,
    charges: &[ScheduledCharge],
    basis: &ChargeBasis,
    balances: &dyn RunningBalances,
    minor_currency_unit_digits: u32,
) -> Result<PaymentBuilder> {
    let mut accrued_this_pass: HashMap<String, Money> = HashMap::new();

    charges.iter().try_fold(builder, |builder, charge| -> Result<PaymentBuilder> {
        let definition = &charge.definition;
        let proportional_to = definition.proportional_to.unwrap_or(ProportionalBasis::PaymentSize);
        let basis_value = basis.value_of(proportional_to, definition, &builder, balances)?;

        if let Some(range) = &charge.range {
            if !range.contains(basis_value.as_decimal()) {
                tracing::debug!(
                    charge = %definition.identifier,
                    basis = %basis_value,
                    "basis outside charge segment, skipped"
                );
                return Ok(builder);
            }
        }

        let settles_accrual = builder.accrual_accounting() && definition.is_accrued() && !charge.is_accrual();
        let amount = if settles_accrual {
            let pending = accrued_this_pass
                .get(&definition.identifier)
                .copied()
                .unwrap_or(Money::ZERO);
            balances.accrued_balance_for_charge(definition)? + pending
        } else {
            charge_amount(charge, basis_value, basis.interest_rate)
        }
        .round_to_minor(minor_currency_unit_digits);

        let (builder, realized) = builder.adjust_balances(charge, amount, balances)?;
        tracing::debug!(
            charge = %definition.identifier,
            action = %charge.scheduled_action.action,
            when = %charge.scheduled_action.when,
            %amount,
            %realized,
            "charge applied"
        );

        if charge.is_accrual() {
            *accrued_this_pass
                .entry(definition.identifier.clone())
                .or_insert(Money::ZERO) += realized;
        }
        Ok(builder)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::SimulatedRunningBalances;
    use crate::charges::{defaults, BalanceSegmentSet, ChargeResolver};
    use crate::schedule::{Period, ScheduledAction};
    use crate::types::{Action, TemporalUnit};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn basis(size: Money) -> ChargeBasis {
        ChargeBasis {
            maximum_balance: Money::from_major(2_000),
            interest_rate: dec!(12),
            payment_size: size,
            principal_adjustment: size,
        }
    }

    fn scheduled(definition: ChargeDefinition, action: ScheduledAction) -> ScheduledCharge {
        ChargeResolver::new(&[definition], &[])
            .unwrap()
            .resolve(&[action])
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn test_fixed_charge_ignores_basis() {
        let charge = scheduled(
            ChargeDefinition::fixed("flat", "Flat", Action::Open, dec!(25), AccountDesignator::Entry, AccountDesignator::ProcessingFeeIncome),
            ScheduledAction::on(Action::Open, date(2024, 1, 15)).unwrap(),
        );
        assert_eq!(charge_amount(&charge, Money::from_major(1_000_000), dec!(12)), Money::from_major(25));
        assert_eq!(charge_amount(&charge, Money::ZERO, dec!(0)), Money::from_major(25));
    }

    #[test]
    fn test_interest_scaled_to_action_period() {
        let charge = scheduled(
            ChargeDefinition::interest(
                "interest",
                "Interest",
                Action::ApplyInterest,
                ProportionalBasis::RunningBalance,
                AccountDesignator::CustomerLoanInterest,
                AccountDesignator::InterestIncome,
            )
            .per(TemporalUnit::Years),
            ScheduledAction::on(Action::ApplyInterest, date(2024, 1, 15)).unwrap(),
        );
        let amount = charge_amount(&charge, Money::from_major(1_000), dec!(12));
        assert_eq!(amount.round_to_minor(2).to_string(), "0.33");
    }

    #[test]
    fn test_tiered_fee_skipped_outside_segment() {
        let sets = vec![BalanceSegmentSet::new("sizes", vec![dec!(0), dec!(1000)], vec!["small", "large"])];
        let small_fee = ChargeDefinition::proportional(
            "small-loan-fee",
            "Small loan fee",
            Action::Disburse,
            dec!(0.02),
            ProportionalBasis::PrincipalAdjustment,
            AccountDesignator::Entry,
            AccountDesignator::DisbursementFeeIncome,
        )
        .in_segments("sizes", "small", "small");
        let charges = ChargeResolver::new(&[small_fee], &sets)
            .unwrap()
            .resolve(&[ScheduledAction::on(Action::Disburse, date(2024, 1, 15)).unwrap()]);
        let balances = SimulatedRunningBalances::new(None);

        let large = apply_scheduled_charges(PaymentBuilder::new(2, None), &charges, &basis(Money::from_major(1_500)), &balances, 2)
            .unwrap()
            .build(None, None);
        assert!(large.cost_components.is_empty());

        let small = apply_scheduled_charges(PaymentBuilder::new(2, None), &charges, &basis(Money::from_major(500)), &balances, 2)
            .unwrap()
            .build(None, None);
        assert_eq!(small.component("small-loan-fee"), Some(Money::from_major(10)));
    }

    #[test]
    fn test_settlement_uses_accrued_balance() {
        let period = Period::new(date(2024, 1, 15), date(2024, 2, 15)).unwrap();
        let action = ScheduledAction::new(Action::AcceptPayment, period.end(), Some(period), Some(period));
        let charges = ChargeResolver::new(&defaults::default_charge_definitions(), &[])
            .unwrap()
            .resolve(&[action]);

        let mut balances = SimulatedRunningBalances::new(Some(period.begin()))
            .with_balance(AccountDesignator::CustomerLoanPrincipal, Money::from_major(2_000))
            .with_balance(AccountDesignator::CustomerLoanInterest, Money::from_decimal(dec!(20.40)))
            .with_balance(AccountDesignator::InterestAccrual, Money::from_decimal(dec!(20.40)));
        balances.record_accrual(defaults::INTEREST_ID, Money::from_decimal(dec!(20.40)));

        let payment = apply_scheduled_charges(
            PaymentBuilder::new(2, Some(Money::from_decimal(dec!(177.78)))),
            &charges,
            &basis(Money::from_decimal(dec!(177.78))),
            &balances,
            2,
        )
        .unwrap()
        .build(None, None);

        assert_eq!(payment.component(defaults::INTEREST_ID), Some(Money::from_decimal(dec!(20.40))));
        assert_eq!(payment.component(defaults::LATE_FEE_ID), Some(Money::ZERO));
        assert_eq!(payment.component(defaults::REPAY_INTEREST_ID), Some(Money::from_decimal(dec!(20.40))));
        assert_eq!(payment.component(defaults::REPAY_PRINCIPAL_ID), Some(Money::from_decimal(dec!(157.38))));
        assert_eq!(payment.component(defaults::PAYMENT_ID), Some(Money::from_decimal(dec!(177.78))));
    }
}
